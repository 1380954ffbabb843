// Fixed parameters of the MIPS32 target

/// Bytes in a machine word; also the size of `int` and of every pointer
pub const WORD_SIZE: usize = 4;

/// Size of the scratch region reserved under the `stack` label in `.data`
/// and carved off `$sp` by the entry stub
pub const STACK_REGION_SIZE: usize = 4096;

/// Frame sizes are rounded up to a multiple of this
pub const FRAME_ALIGN: usize = 8;

/// Bytes at the top of every frame holding the saved `$ra` and `$s8`
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest object, frame or `sizeof` result; sizes and frame offsets are
/// signed 32-bit quantities on the target
pub const MAX_OBJECT_SIZE: usize = i32::MAX as usize;

/// Arguments travel in `$a0`..`$a3`; there is no stack-passing convention
pub const MAX_REG_ARGS: usize = 4;

/// Argument registers in parameter order
pub const ARG_REGS: [&str; MAX_REG_ARGS] = ["$a0", "$a1", "$a2", "$a3"];

// Syscall numbers placed in `$v0`
pub const SYS_EXIT: i32 = 4001;
pub const SYS_READ: i32 = 4003;
pub const SYS_WRITE: i32 = 4004;

pub const STDIN_FD: i32 = 0;
pub const STDOUT_FD: i32 = 1;
