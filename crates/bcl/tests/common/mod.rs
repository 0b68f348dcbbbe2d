// crates/bcl/tests/common/mod.rs
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A temporary directory of `.bcl` files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: TempDir::new().expect("Failed to create temporary directory"),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }
}

/// `count` independent documents whose variables never collide.
pub fn documents(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            let source = format!(
                "value_{i} = {i} * 10\n\
                 service_{i} \"svc_{i}\" {{ port = 8000 + {i}\n tags = [\"t{i}\"] }}\n\
                 label_{i} = \"doc ${{value_{i}}}\""
            );
            (format!("doc_{i}.bcl"), source)
        })
        .collect()
}
