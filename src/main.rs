use anyhow::{Context, bail};
use fbxdemo::app::AppHandler;
use fbxdemo::fbx::Document;
use fbxdemo::model::dump::node_tree_json;
use std::path::{Path, PathBuf};
use winit::event_loop::{ControlFlow, EventLoop};

const USAGE: &str = "usage: fbxdemo [resource-dir] [--dump <file.fbx>]";

/// Prints the model tree of an FBX file as JSON.
fn dump(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = Document::from_bytes(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    println!("{}", node_tree_json(&doc)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut resource_dir = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" => {
                let Some(file) = args.next() else {
                    bail!(USAGE);
                };
                return dump(Path::new(&file));
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ if resource_dir.is_none() => resource_dir = Some(PathBuf::from(arg)),
            _ => bail!(USAGE),
        }
    }

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = AppHandler::new(runtime, resource_dir);
    event_loop.run_app(&mut handler)?;
    Ok(())
}
