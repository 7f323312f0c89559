#![no_main]
use libfuzzer_sys::fuzz_target;
use memdb_rs::{connect, register_vfs};
use std::sync::{Arc, Once};

const VFS: &str = "memvfs-fuzz";

static INIT: Once = Once::new();

// Arbitrary bytes served as a database image must never crash SQLite or the VFS
fuzz_target!(|image: &[u8]| {
    INIT.call_once(|| {
        register_vfs(VFS, Arc::clone(memdb_rs::global_registry())).unwrap();
    });

    let name = format!("fuzz-{}.db", std::process::id());
    memdb_rs::delete(&name);
    if memdb_rs::create(&name, image).is_err() {
        return;
    }

    if let Ok(conn) = connect(VFS, &name) {
        let _ = conn.query_row("PRAGMA integrity_check", [], |row| row.get::<_, String>(0));
        let _ = conn.execute_batch("CREATE TABLE IF NOT EXISTS f (x); INSERT INTO f VALUES (1);");
    }

    memdb_rs::delete(&name);
});
