use std::process::Command;

use tempfile::tempdir;
use zipcraft::{EntryOptions, ZipWriter};

/// Writes a ZIP using the library, then calls `unzip -t` to verify a
/// real-world reader accepts it. Skips gracefully if `unzip` isn't present.
#[test]
fn unzip_compatibility() {
    let check = Command::new("unzip").arg("-v").output();
    if check.is_err() {
        eprintln!("skipping test: `unzip` not found");
        return;
    }

    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("compat.zip");

    {
        let mut writer = ZipWriter::create(&zip_path).unwrap();
        writer.begin_entry(EntryOptions::new("hello.txt")).unwrap();
        writer.write(b"hello from test").unwrap();

        writer.begin_entry(EntryOptions::new("big.bin")).unwrap();
        for _ in 0..1024 {
            writer.write(&[0u8; 1024]).unwrap();
        }

        writer.finish().unwrap();
    }

    let output = Command::new("unzip")
        .arg("-t")
        .arg(&zip_path)
        .output()
        .expect("failed to run unzip");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "unzip reported failure: {} {}",
        stdout,
        stderr
    );
}
