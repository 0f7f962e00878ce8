//! User-defined scalar and aggregate functions.
//!
//! Host callables are boxed together with their marshalling options and
//! handed to SQLite as the application data pointer of
//! `sqlite3_create_function_v2`; SQLite owns that allocation and frees it
//! through the destructor callback when the function is replaced, removed
//! or the connection closes. The C trampolines marshal arguments through
//! the codec, catch panics, and convert host errors into
//! `sqlite3_result_error`, so the host's failure propagates to the SQL
//! evaluator instead of unwinding across the FFI boundary.

use crate::codec;
use crate::database::Database;
use crate::ffi;
use sqlitekit_core::{Error, Result, Value};
use std::ffi::{CString, c_int, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Options for registering a host function.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionOptions {
    /// The function always returns the same result for the same inputs.
    pub deterministic: bool,
    /// The function may only be invoked from top-level SQL (not from
    /// triggers, views or schema structures).
    pub direct_only: bool,
    /// The function inspects the subtype of its arguments.
    pub subtype: bool,
    /// The function has no side effects and reveals nothing about its
    /// parameters (safe under `trusted_schema=0`).
    pub innocuous: bool,
    /// Accept any number of arguments.
    pub varargs: bool,
    /// Exact argument count; ignored when `varargs` is set, and varargs
    /// is assumed when absent.
    pub args: Option<i32>,
}

impl FunctionOptions {
    /// Create the default option set (varargs, no flags).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the function deterministic.
    #[must_use]
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Restrict the function to top-level SQL.
    #[must_use]
    pub fn direct_only(mut self, direct_only: bool) -> Self {
        self.direct_only = direct_only;
        self
    }

    /// Mark the function subtype-aware.
    #[must_use]
    pub fn subtype(mut self, subtype: bool) -> Self {
        self.subtype = subtype;
        self
    }

    /// Mark the function innocuous.
    #[must_use]
    pub fn innocuous(mut self, innocuous: bool) -> Self {
        self.innocuous = innocuous;
        self
    }

    /// Accept any number of arguments.
    #[must_use]
    pub fn varargs(mut self, varargs: bool) -> Self {
        self.varargs = varargs;
        self
    }

    /// Fix the argument count.
    #[must_use]
    pub fn args(mut self, args: i32) -> Self {
        self.args = Some(args);
        self
    }

    fn arity(&self) -> c_int {
        if self.varargs {
            -1
        } else {
            self.args.unwrap_or(-1) as c_int
        }
    }

    fn flags(&self) -> c_int {
        let mut flags = ffi::SQLITE_UTF8;
        if self.deterministic {
            flags |= ffi::SQLITE_DETERMINISTIC;
        }
        if self.direct_only {
            flags |= ffi::SQLITE_DIRECTONLY;
        }
        if self.subtype {
            flags |= ffi::SQLITE_SUBTYPE;
        }
        if self.innocuous {
            flags |= ffi::SQLITE_INNOCUOUS;
        }
        flags
    }
}

/// Behavior of a host aggregate function.
///
/// Each SQL-level invocation gets its own accumulator, seeded from `init`
/// and threaded through `step`; the optional `finish` maps the final
/// accumulator to the result. State is erased when the invocation
/// completes.
pub struct Aggregate {
    init: Value,
    step: Box<dyn Fn(Value, &[Value]) -> Result<Value>>,
    finish: Option<Box<dyn Fn(Value) -> Result<Value>>>,
}

impl Aggregate {
    /// An aggregate seeded with `init`, folding rows through `step`.
    pub fn new(
        init: impl Into<Value>,
        step: impl Fn(Value, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            init: init.into(),
            step: Box::new(step),
            finish: None,
        }
    }

    /// Map the final accumulator to the result.
    #[must_use]
    pub fn finish(mut self, finish: impl Fn(Value) -> Result<Value> + 'static) -> Self {
        self.finish = Some(Box::new(finish));
        self
    }
}

struct ScalarState {
    name: String,
    int64: bool,
    func: Box<dyn Fn(&[Value]) -> Result<Value>>,
}

struct AggregateState {
    name: String,
    int64: bool,
    aggregate: Aggregate,
}

unsafe fn collect_args(argc: c_int, argv: *mut *mut ffi::sqlite3_value, int64: bool) -> Vec<Value> {
    let mut args = Vec::with_capacity(argc.max(0) as usize);
    for i in 0..argc.max(0) {
        // SAFETY: argv holds argc protected values
        args.push(unsafe { codec::read_value(*argv.add(i as usize), int64) });
    }
    args
}

unsafe extern "C" fn scalar_trampoline(
    ctx: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) {
    // SAFETY: user_data is the ScalarState registered with this function
    let state = unsafe { &*(ffi::sqlite3_user_data(ctx) as *const ScalarState) };
    let args = unsafe { collect_args(argc, argv, state.int64) };

    match catch_unwind(AssertUnwindSafe(|| (state.func)(&args))) {
        // SAFETY: ctx is the active invocation context
        Ok(Ok(value)) => unsafe { codec::set_result(ctx, &value) },
        Ok(Err(err)) => unsafe { codec::set_result_error(ctx, &err.to_string()) },
        Err(_) => unsafe {
            codec::set_result_error(ctx, &format!("panic in function {}", state.name));
        },
    }
}

unsafe extern "C" fn destroy_scalar(state: *mut c_void) {
    // SAFETY: state was produced by Box::into_raw in Database::function
    drop(unsafe { Box::from_raw(state as *mut ScalarState) });
}

/// Per-invocation accumulator slot, allocated by sqlite3_aggregate_context
/// and keyed by it. Holds a boxed Value between steps; null before the
/// first step and after the finalizer erases it.
type AccumulatorSlot = *mut Value;

unsafe extern "C" fn aggregate_step_trampoline(
    ctx: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) {
    // SAFETY: user_data is the AggregateState registered with this function
    let state = unsafe { &*(ffi::sqlite3_user_data(ctx) as *const AggregateState) };

    // SAFETY: ctx is the active invocation context
    let slot = unsafe {
        ffi::sqlite3_aggregate_context(ctx, size_of::<AccumulatorSlot>() as c_int)
    } as *mut AccumulatorSlot;
    if slot.is_null() {
        unsafe { codec::set_result_error(ctx, "out of memory in aggregate step") };
        return;
    }

    // SAFETY: the slot is zero-initialized on first use
    let acc = unsafe {
        if (*slot).is_null() {
            state.aggregate.init.clone()
        } else {
            let boxed = Box::from_raw(*slot);
            *slot = std::ptr::null_mut();
            *boxed
        }
    };

    let args = unsafe { collect_args(argc, argv, state.int64) };
    match catch_unwind(AssertUnwindSafe(|| (state.aggregate.step)(acc, &args))) {
        Ok(Ok(next)) => unsafe {
            *slot = Box::into_raw(Box::new(next));
        },
        Ok(Err(err)) => unsafe { codec::set_result_error(ctx, &err.to_string()) },
        Err(_) => unsafe {
            codec::set_result_error(ctx, &format!("panic in aggregate {}", state.name));
        },
    }
}

unsafe extern "C" fn aggregate_final_trampoline(ctx: *mut ffi::sqlite3_context) {
    // SAFETY: user_data is the AggregateState registered with this function
    let state = unsafe { &*(ffi::sqlite3_user_data(ctx) as *const AggregateState) };

    // Passing 0 returns the existing slot, or null if no step ever ran
    // (aggregate over an empty input yields the seed value).
    // SAFETY: ctx is the active invocation context
    let slot = unsafe { ffi::sqlite3_aggregate_context(ctx, 0) } as *mut AccumulatorSlot;
    let acc = unsafe {
        if slot.is_null() || (*slot).is_null() {
            state.aggregate.init.clone()
        } else {
            let boxed = Box::from_raw(*slot);
            *slot = std::ptr::null_mut();
            *boxed
        }
    };

    let finish = state.aggregate.finish.as_deref();
    let outcome = catch_unwind(AssertUnwindSafe(|| match finish {
        Some(finish) => finish(acc),
        None => Ok(acc),
    }));

    match outcome {
        // SAFETY: ctx is the active invocation context
        Ok(Ok(value)) => unsafe { codec::set_result(ctx, &value) },
        Ok(Err(err)) => unsafe { codec::set_result_error(ctx, &err.to_string()) },
        Err(_) => unsafe {
            codec::set_result_error(ctx, &format!("panic in aggregate {}", state.name));
        },
    }
}

unsafe extern "C" fn destroy_aggregate(state: *mut c_void) {
    // SAFETY: state was produced by Box::into_raw in Database::aggregate
    drop(unsafe { Box::from_raw(state as *mut AggregateState) });
}

impl Database {
    /// Register a scalar host function callable from SQL.
    ///
    /// The callable receives the invocation's arguments as [`Value`]s and
    /// returns the result value; an `Err` or panic surfaces to the SQL
    /// evaluator as a statement error.
    pub fn function(
        &self,
        name: &str,
        options: FunctionOptions,
        func: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Result<()> {
        let db = self.shared.raw()?;
        let c_name = CString::new(name)
            .map_err(|_| Error::sqlite(ffi::SQLITE_MISUSE, "function name contains a NUL byte"))?;
        let nargs = options.arity();

        let state = Box::into_raw(Box::new(ScalarState {
            name: name.to_string(),
            int64: self.options().int64,
            func: Box::new(func),
        }));

        // SAFETY: db is valid; on failure SQLite invokes the destructor on
        // the application pointer before returning
        let rc = unsafe {
            ffi::sqlite3_create_function_v2(
                db,
                c_name.as_ptr(),
                nargs,
                options.flags(),
                state.cast(),
                Some(scalar_trampoline),
                None,
                None,
                Some(destroy_scalar),
            )
        };
        self.shared.check(rc)?;

        self.shared.record_function(c_name, nargs);
        Ok(())
    }

    /// Register an aggregate host function callable from SQL.
    pub fn aggregate(
        &self,
        name: &str,
        options: FunctionOptions,
        aggregate: Aggregate,
    ) -> Result<()> {
        let db = self.shared.raw()?;
        let c_name = CString::new(name)
            .map_err(|_| Error::sqlite(ffi::SQLITE_MISUSE, "function name contains a NUL byte"))?;
        let nargs = options.arity();

        let state = Box::into_raw(Box::new(AggregateState {
            name: name.to_string(),
            int64: self.options().int64,
            aggregate,
        }));

        // SAFETY: db is valid; on failure SQLite invokes the destructor on
        // the application pointer before returning
        let rc = unsafe {
            ffi::sqlite3_create_function_v2(
                db,
                c_name.as_ptr(),
                nargs,
                options.flags(),
                state.cast(),
                None,
                Some(aggregate_step_trampoline),
                Some(aggregate_final_trampoline),
                Some(destroy_aggregate),
            )
        };
        self.shared.check(rc)?;

        self.shared.record_function(c_name, nargs);
        Ok(())
    }
}
