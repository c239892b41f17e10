use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

#[path = "src/cli.rs"]
mod cli;

const BIN: &str = "emrscope";

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir: PathBuf = std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo").into();
    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");
    write_man_pages(&cmd, &man_dir);

    let completion_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_dir).expect("failed to create completion output directory");
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, BIN, &completion_dir)
            .unwrap_or_else(|e| panic!("failed to write {shell} completions: {e}"));
    }
}

/// `emrscope.1`, then `emrscope-ls.1`, `emrscope-filter-set.1`, and so on.
/// Hidden subcommands get no page.
fn write_man_pages(cmd: &clap::Command, dir: &Path) {
    let page = cmd.get_name().to_owned();
    let target = dir.join(format!("{page}.1"));

    let mut roff = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .render(&mut roff)
        .unwrap_or_else(|e| panic!("failed to render {page}.1: {e}"));
    fs::write(&target, roff).unwrap_or_else(|e| panic!("failed to write {}: {e}", target.display()));

    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        let named = sub.clone().name(format!("{page}-{}", sub.get_name()));
        write_man_pages(&named, dir);
    }
}
