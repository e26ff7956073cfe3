//! Prints the `Application` CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > deploy/crds/application.yaml`

use crds::Application;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Application::crd())?);
    Ok(())
}
