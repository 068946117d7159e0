//! End-to-end tests for the memctl facade against temporary sources.

use memctl::{
    GcError, GcModule, GcState, HeapInfo, MemctlConfig, MemoryTriple, Operation, QueryError,
    Reclaimer, Value,
};
use serial_test::serial;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Block-counting heap that collects on its own when the state allows it.
#[derive(Debug, Default)]
struct ScriptedHeap {
    used: usize,
    free: usize,
    since_collect: usize,
    auto_runs: usize,
    explicit_runs: usize,
}

impl ScriptedHeap {
    fn with_capacity(bytes: usize) -> Self {
        Self {
            free: bytes,
            ..Self::default()
        }
    }

    fn allocate(&mut self, blocks: usize, state: &GcState) {
        self.since_collect += blocks;
        let bytes = blocks * memctl::BYTES_PER_BLOCK;
        self.used += bytes;
        self.free = self.free.saturating_sub(bytes);
        if state.should_auto_collect(self.since_collect) {
            self.auto_runs += 1;
            self.since_collect = 0;
        }
    }
}

impl Reclaimer for ScriptedHeap {
    fn collect(&mut self, _state: &GcState) -> usize {
        self.explicit_runs += 1;
        let reclaimed = self.used / memctl::BYTES_PER_BLOCK;
        self.free += self.used;
        self.used = 0;
        self.since_collect = 0;
        reclaimed
    }

    fn info(&self) -> HeapInfo {
        HeapInfo {
            free: self.free,
            used: self.used,
            max_growable: Some(4096),
        }
    }
}

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .map(|dir| dir.count())
        .unwrap_or(0)
}

fn mmz_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn module_with(procfs: &Path, device: &Path, heap: ScriptedHeap) -> GcModule<ScriptedHeap> {
    let config = MemctlConfig {
        device_path: device.to_path_buf(),
        procfs_path: procfs.to_path_buf(),
    };
    GcModule::with_config(heap, &config)
}

#[test]
#[serial]
fn test_sys_mmz_reads_summary() {
    let dir = TempDir::new().unwrap();
    let procfs = mmz_file("total:1000,used:400,remain=600\n");
    let mut module = module_with(procfs.path(), &dir.path().join("misc"), ScriptedHeap::default());

    let value = module.call_named("sys_mmz", &[]).unwrap();
    assert_eq!(value, Value::Triple(MemoryTriple::new(1000, 400, 600)));
    assert_eq!(value.to_string(), "(1000, 400, 600)");
}

#[test]
#[serial]
fn test_sys_mmz_malformed_returns_zeros() {
    let dir = TempDir::new().unwrap();
    let procfs = mmz_file("total:1000,used:400\n");
    let module = module_with(procfs.path(), &dir.path().join("misc"), ScriptedHeap::default());

    assert_eq!(module.sys_mmz().unwrap(), MemoryTriple::new(1000, 400, 0));
}

#[test]
#[serial]
fn test_missing_sources_leave_no_descriptor() {
    let dir = TempDir::new().unwrap();
    let mut module = module_with(
        &dir.path().join("media-mem"),
        &dir.path().join("canmv_misc"),
        ScriptedHeap::default(),
    );

    let before = open_fds();
    for name in ["sys_heap", "sys_page", "sys_mmz"] {
        match module.call_named(name, &[]) {
            Err(GcError::Query(QueryError::ResourceUnavailable { code, .. })) => {
                assert_eq!(code, libc_enoent())
            }
            other => panic!("{name}: unexpected result {other:?}"),
        }
    }
    assert_eq!(open_fds(), before);
}

fn libc_enoent() -> i32 {
    std::io::Error::from(std::io::ErrorKind::NotFound)
        .raw_os_error()
        .unwrap_or(2)
}

#[test]
#[serial]
fn test_device_rejecting_request_is_reported() {
    let dir = TempDir::new().unwrap();
    let fake_device = NamedTempFile::new().unwrap();
    let module = module_with(&dir.path().join("media-mem"), fake_device.path(), ScriptedHeap::default());

    let before = open_fds();
    let err = module.sys_heap().unwrap_err();
    assert!(matches!(err, QueryError::ControlRequest { request: 0x1024, .. }));
    let err = module.sys_page().unwrap_err();
    assert!(matches!(err, QueryError::ControlRequest { request: 0x1025, .. }));
    assert_eq!(open_fds(), before);
}

#[test]
fn test_collect_and_heap_figures() {
    let mut module = GcModule::new(ScriptedHeap::with_capacity(64 * 1024));
    let state = module.state().clone();
    module.reclaimer_mut().allocate(10, &state);

    let used = 10 * memctl::BYTES_PER_BLOCK;
    assert_eq!(module.mem_alloc(), used);
    #[cfg(feature = "split-heap-auto")]
    assert_eq!(module.mem_free(), 64 * 1024 - used + 4096);
    #[cfg(not(feature = "split-heap-auto"))]
    assert_eq!(module.mem_free(), 64 * 1024 - used);

    let collected = module.call(Operation::Collect, &[]).unwrap();
    #[cfg(feature = "collect-retval")]
    assert_eq!(collected, Value::Int(10));
    #[cfg(not(feature = "collect-retval"))]
    assert_eq!(collected, Value::None);

    assert_eq!(module.mem_alloc(), 0);
    assert_eq!(module.reclaimer().explicit_runs, 1);
}

#[test]
fn test_disable_still_allows_explicit_collect() {
    let mut module = GcModule::new(ScriptedHeap::with_capacity(1024));
    module.call_named("disable", &[]).unwrap();
    assert_eq!(module.call_named("isenabled", &[]).unwrap(), Value::Bool(false));

    module.call_named("collect", &[]).unwrap();
    assert_eq!(module.reclaimer().explicit_runs, 1);
}

#[cfg(feature = "alloc-threshold")]
#[test]
fn test_threshold_drives_automatic_collection() {
    let block = memctl::BYTES_PER_BLOCK as i64;
    let mut module = GcModule::new(ScriptedHeap::with_capacity(1 << 20));

    // No threshold: never collects on its own.
    let state = module.state().clone();
    module.reclaimer_mut().allocate(1000, &state);
    assert_eq!(module.reclaimer().auto_runs, 0);

    module.call_named("threshold", &[block * 16 + 5]).unwrap();
    assert_eq!(module.call_named("threshold", &[]).unwrap(), Value::Int(block * 16));

    let state = module.state().clone();
    module.reclaimer_mut().allocate(16, &state);
    assert_eq!(module.reclaimer().auto_runs, 1);

    module.call_named("disable", &[]).unwrap();
    let state = module.state().clone();
    module.reclaimer_mut().allocate(64, &state);
    assert_eq!(module.reclaimer().auto_runs, 1);

    module.call_named("threshold", &[-100]).unwrap();
    assert_eq!(module.call_named("threshold", &[]).unwrap(), Value::Int(-1));
}

#[test]
fn test_json_results() {
    let mut module = GcModule::new(ScriptedHeap::with_capacity(2048));
    let value = module.call_named("isenabled", &[]).unwrap();
    assert_eq!(serde_json::to_string(&value).unwrap(), "true");

    let triple = Value::from(MemoryTriple::new(3, 2, 1));
    assert_eq!(
        serde_json::to_value(triple).unwrap(),
        serde_json::json!({ "total": 3, "used": 2, "free": 1 })
    );
}
