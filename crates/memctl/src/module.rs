//! The control facade.
//!
//! [`GcModule`] owns the collector state and the two system queries, and
//! dispatches named operations to them:
//!
//! | Name | Delegates to |
//! |------|--------------|
//! | `collect` | [`Reclaimer::collect`] |
//! | `disable` / `enable` / `isenabled` | [`GcState`] switch |
//! | `mem_free` / `mem_alloc` | [`Reclaimer::info`] |
//! | `sys_heap` / `sys_page` | [`DeviceQuery`] |
//! | `sys_mmz` | [`MmzQuery`] |
//! | `threshold` | [`GcState`] threshold (`alloc-threshold` only) |

use crate::config::MemctlConfig;
use crate::value::Value;
use memctl_heap::{GcState, Reclaimer, mem_alloc, mem_free};
use memctl_sys::{DeviceQuery, MemoryPool, MemoryTriple, MmzQuery, QueryError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors from facade calls
#[derive(Debug, Error)]
pub enum GcError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{op}() takes {expected} arguments ({given} given)")]
    ArgumentCount {
        op: &'static str,
        expected: &'static str,
        given: usize,
    },
}

/// An operation exposed by the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Collect,
    Disable,
    Enable,
    IsEnabled,
    MemFree,
    MemAlloc,
    SysHeap,
    SysPage,
    SysMmz,
    #[cfg(feature = "alloc-threshold")]
    Threshold,
}

/// Dispatch table, in registration order
const OPERATIONS: &[(&str, Operation)] = &[
    ("collect", Operation::Collect),
    ("disable", Operation::Disable),
    ("enable", Operation::Enable),
    ("isenabled", Operation::IsEnabled),
    ("mem_free", Operation::MemFree),
    ("mem_alloc", Operation::MemAlloc),
    ("sys_heap", Operation::SysHeap),
    ("sys_page", Operation::SysPage),
    ("sys_mmz", Operation::SysMmz),
    #[cfg(feature = "alloc-threshold")]
    ("threshold", Operation::Threshold),
];

impl Operation {
    /// All registered operations
    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|(_, op)| *op)
    }

    pub fn name(self) -> &'static str {
        OPERATIONS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Accepted argument counts, as `(min, max)`
    pub fn arity(self) -> (usize, usize) {
        match self {
            #[cfg(feature = "alloc-threshold")]
            Operation::Threshold => (0, 1),
            _ => (0, 0),
        }
    }

    fn check_args(self, given: usize) -> Result<(), GcError> {
        let (min, max) = self.arity();
        if (min..=max).contains(&given) {
            return Ok(());
        }
        Err(GcError::ArgumentCount {
            op: self.name(),
            expected: if max == 0 { "no" } else { "at most 1" },
            given,
        })
    }
}

impl FromStr for Operation {
    type Err = GcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OPERATIONS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, op)| *op)
            .ok_or_else(|| GcError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory control surface over a reclaimer and the host memory sources.
///
/// Holds process-wide mutable state without synchronization; wrap it in a
/// lock if more than one thread needs it.
pub struct GcModule<R> {
    reclaimer: R,
    state: GcState,
    device: DeviceQuery,
    mmz: MmzQuery,
}

impl<R: Reclaimer> GcModule<R> {
    /// Create with default source locations.
    pub fn new(reclaimer: R) -> Self {
        Self::with_config(reclaimer, &MemctlConfig::default())
    }

    pub fn with_config(reclaimer: R, config: &MemctlConfig) -> Self {
        debug!(
            device = %config.device_path.display(),
            procfs = %config.procfs_path.display(),
            "Creating memory control module"
        );
        Self {
            reclaimer,
            state: GcState::new(),
            device: DeviceQuery::new(&config.device_path),
            mmz: MmzQuery::new(&config.procfs_path),
        }
    }

    /// Run a collection. Returns the reclaimed block count when
    /// `collect-retval` is enabled.
    pub fn collect(&mut self) -> Option<usize> {
        let collected = self.reclaimer.collect(&self.state);
        debug!(collected, "Collection complete");
        #[cfg(feature = "collect-retval")]
        {
            Some(collected)
        }
        #[cfg(not(feature = "collect-retval"))]
        {
            None
        }
    }

    pub fn enable(&mut self) {
        self.state.enable();
    }

    pub fn disable(&mut self) {
        self.state.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    pub fn mem_free(&self) -> usize {
        mem_free(&self.reclaimer)
    }

    pub fn mem_alloc(&self) -> usize {
        mem_alloc(&self.reclaimer)
    }

    pub fn sys_heap(&self) -> Result<MemoryTriple, QueryError> {
        self.device.query(MemoryPool::Heap)
    }

    pub fn sys_page(&self) -> Result<MemoryTriple, QueryError> {
        self.device.query(MemoryPool::Page)
    }

    pub fn sys_mmz(&self) -> Result<MemoryTriple, QueryError> {
        self.mmz.query()
    }

    /// Get the threshold in bytes (`-1` when disabled), or set it and
    /// return `None`.
    #[cfg(feature = "alloc-threshold")]
    pub fn threshold(&mut self, bytes: Option<i64>) -> Option<i64> {
        match bytes {
            None => Some(self.state.threshold()),
            Some(bytes) => {
                self.state.set_threshold(bytes);
                None
            }
        }
    }

    /// Invoke an operation with positional integer arguments.
    pub fn call(&mut self, op: Operation, args: &[i64]) -> Result<Value, GcError> {
        op.check_args(args.len())?;
        debug!(%op, ?args, "Dispatching");

        let value = match op {
            Operation::Collect => self.collect().into(),
            Operation::Disable => {
                self.disable();
                Value::None
            }
            Operation::Enable => {
                self.enable();
                Value::None
            }
            Operation::IsEnabled => self.is_enabled().into(),
            Operation::MemFree => self.mem_free().into(),
            Operation::MemAlloc => self.mem_alloc().into(),
            Operation::SysHeap => self.sys_heap()?.into(),
            Operation::SysPage => self.sys_page()?.into(),
            Operation::SysMmz => self.sys_mmz()?.into(),
            #[cfg(feature = "alloc-threshold")]
            Operation::Threshold => self.threshold(args.first().copied()).into(),
        };
        Ok(value)
    }

    /// Invoke an operation by name.
    pub fn call_named(&mut self, name: &str, args: &[i64]) -> Result<Value, GcError> {
        self.call(name.parse()?, args)
    }

    /// Registered operation names, in table order
    pub fn operations() -> impl Iterator<Item = &'static str> {
        OPERATIONS.iter().map(|(name, _)| *name)
    }

    pub fn state(&self) -> &GcState {
        &self.state
    }

    pub fn reclaimer(&self) -> &R {
        &self.reclaimer
    }

    pub fn reclaimer_mut(&mut self) -> &mut R {
        &mut self.reclaimer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memctl_heap::HeapInfo;

    #[derive(Default)]
    struct CountingHeap {
        runs: usize,
    }

    impl Reclaimer for CountingHeap {
        fn collect(&mut self, _state: &GcState) -> usize {
            self.runs += 1;
            self.runs * 10
        }

        fn info(&self) -> HeapInfo {
            HeapInfo {
                free: 2048,
                used: 512,
                max_growable: None,
            }
        }
    }

    #[test]
    fn test_names_roundtrip() {
        for op in Operation::all() {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        assert!(matches!(
            "gc".parse::<Operation>(),
            Err(GcError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_table_order() {
        let names: Vec<_> = GcModule::<CountingHeap>::operations().collect();
        assert_eq!(&names[..4], ["collect", "disable", "enable", "isenabled"]);
        assert_eq!(names.contains(&"threshold"), cfg!(feature = "alloc-threshold"));
    }

    #[test]
    fn test_toggle_via_dispatch() {
        let mut module = GcModule::new(CountingHeap::default());
        assert_eq!(module.call(Operation::IsEnabled, &[]).unwrap(), Value::Bool(true));

        assert_eq!(module.call_named("disable", &[]).unwrap(), Value::None);
        assert_eq!(module.call_named("isenabled", &[]).unwrap(), Value::Bool(false));

        module.call_named("enable", &[]).unwrap();
        assert!(module.is_enabled());
    }

    #[test]
    fn test_collect_result() {
        let mut module = GcModule::new(CountingHeap::default());
        let value = module.call(Operation::Collect, &[]).unwrap();

        #[cfg(feature = "collect-retval")]
        assert_eq!(value, Value::Int(10));
        #[cfg(not(feature = "collect-retval"))]
        assert_eq!(value, Value::None);

        assert_eq!(module.reclaimer().runs, 1);
    }

    #[test]
    fn test_heap_figures() {
        let mut module = GcModule::new(CountingHeap::default());
        assert_eq!(module.call(Operation::MemAlloc, &[]).unwrap(), Value::Int(512));
        assert_eq!(module.call(Operation::MemFree, &[]).unwrap(), Value::Int(2048));
    }

    #[test]
    fn test_rejects_arguments() {
        let mut module = GcModule::new(CountingHeap::default());
        let err = module.call(Operation::Enable, &[1]).unwrap_err();
        assert!(matches!(
            err,
            GcError::ArgumentCount { op: "enable", given: 1, .. }
        ));
        assert_eq!(err.to_string(), "enable() takes no arguments (1 given)");
    }

    #[cfg(feature = "alloc-threshold")]
    #[test]
    fn test_threshold_dispatch() {
        use memctl_heap::BYTES_PER_BLOCK;

        let mut module = GcModule::new(CountingHeap::default());
        assert_eq!(module.call(Operation::Threshold, &[]).unwrap(), Value::Int(-1));

        let bytes = BYTES_PER_BLOCK as i64 * 100 + 1;
        assert_eq!(module.call(Operation::Threshold, &[bytes]).unwrap(), Value::None);
        assert_eq!(
            module.call(Operation::Threshold, &[]).unwrap(),
            Value::Int(BYTES_PER_BLOCK as i64 * 100)
        );
        assert_eq!(module.state().alloc_threshold_blocks(), 100);

        module.call(Operation::Threshold, &[-1]).unwrap();
        assert_eq!(module.threshold(None), Some(-1));

        assert!(matches!(
            module.call(Operation::Threshold, &[1, 2]),
            Err(GcError::ArgumentCount { op: "threshold", given: 2, .. })
        ));
    }

    #[cfg(not(feature = "alloc-threshold"))]
    #[test]
    fn test_threshold_not_registered() {
        let mut module = GcModule::new(CountingHeap::default());
        assert!(matches!(
            module.call_named("threshold", &[]),
            Err(GcError::UnknownOperation(_))
        ));
    }
}
