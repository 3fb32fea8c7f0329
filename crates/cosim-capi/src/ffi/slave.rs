use std::ffi::{c_char, c_int};

use crate::boundary::{self, c_str, call};
use crate::registry::SlaveHandle;
use crate::slave::{LocalSlave, SLAVES};

/// Instantiate the model at `source` (a `builtin:<model>` URI or a path)
/// under `instance_name`.
///
/// # Safety
/// Both arguments must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_local_slave_create(source: *const c_char, instance_name: *const c_char) -> SlaveHandle {
    call(SlaveHandle::NULL, || {
        // SAFETY: forwarded caller contract.
        let (source, name) = unsafe { (c_str(source, "source")?, c_str(instance_name, "instanceName")?) };
        Ok(SLAVES.insert(LocalSlave::create(source, name)?))
    })
}

/// Release a slave handle.  An instance not yet added to an execution is
/// released with it; an added one belongs to its execution.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_local_slave_destroy(slave: SlaveHandle) -> c_int {
    boundary::status(|| SLAVES.remove(slave).map(drop))
}
