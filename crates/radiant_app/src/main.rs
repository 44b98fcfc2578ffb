use std::{path::PathBuf, process::ExitCode};

use log::error;
use radiant_core::RendererConfig;
use radiant_window::run;

const USAGE: &str = "usage: radiant <scene.gltf|glb> [config.json]";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args_os().skip(1);
    let Some(scene_path) = args.next().map(PathBuf::from) else {
        error!("{USAGE}");
        return ExitCode::from(2);
    };

    let config = match args.next() {
        Some(path) => match RendererConfig::from_file(PathBuf::from(path)) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => RendererConfig::default(),
    };

    match run(scene_path, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
