//! Create the key pair a node registers with:
//!
//! `cargo run --bin gen-key <name>`
//!
//! Writes the seed to `config/<name>/<name>.key` and the public key to
//! `config/<name>/<name>.pub`, then prints the peer id: that is the value
//! the tracker will file the node under.

use siegel::Identity;
use std::{env::args, fs, process};

fn main() {
    let name = match args().nth(1) {
        Some(name) => name,
        None => {
            eprintln!("usage: gen-key <name>");
            process::exit(1);
        }
    };

    let identity = Identity::generate();
    let dir = format!("config/{}", name);
    fs::create_dir_all(&dir).expect("could not create the config directory");
    fs::write(format!("{}/{}.key", dir, name), identity.hex())
        .expect("could not write the key file");
    fs::write(format!("{}/{}.pub", dir, name), identity.id().hex())
        .expect("could not write the pub file");

    println!("{}", identity.id().hex());
}
