// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Mirrors `src/cli.rs`; build scripts cannot use the crate's own modules
fn build_cli() -> Command {
    Command::new("autopatch")
        .version(env!("CARGO_PKG_VERSION"))
        .author("autopatch contributors")
        .about("Unattended OS update installer that reboots and resumes until no updates remain")
        .after_help(
            "Configuration is read from $AUTOPATCH_CONFIG, or /etc/autopatch/autopatch.toml \
             when unset. Log verbosity follows RUST_LOG (default: info).",
        )
        .arg(
            Arg::new("retries_on_reboot")
                .long("retries-on-reboot")
                .value_name("COUNT")
                .default_value("3")
                .help("Reboots allowed to retry a failed install before giving up"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("autopatch.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
