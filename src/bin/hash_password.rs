//! Print a password hash for `AUTH_PASSWORD_HASH`.
//!
//! ```bash
//! cargo run --bin hash-password -- 'my password'
//! echo 'my password' | cargo run --bin hash-password
//! ```

use std::io::BufRead;

use anyhow::{bail, Context};
use control_panel::auth::hash_password;

fn main() -> anyhow::Result<()> {
    let password = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        bail!("usage: hash-password <password>  (or pipe it on stdin)");
    }

    println!("{}", hash_password(&password));
    Ok(())
}
