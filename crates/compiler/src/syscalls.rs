//! The fixed syscall table.
//!
//! Maps language-level `$name` identifiers to i386 syscall numbers. The
//! lexer matches source text against the keys (longest match wins); the
//! code generator loads the number into `eax` before `int 80h`.

/// Known syscalls, keyed by their `$`-prefixed source spelling.
pub static SYSCALL_TABLE: &[(&str, u32)] = &[
    ("$exit", 1),
    ("$fork", 2),
    ("$read", 3),
    ("$write", 4),
    ("$open", 5),
    ("$close", 6),
    ("$waitpid", 7),
    ("$creat", 8),
    ("$link", 9),
    ("$unlink", 10),
    ("$execve", 11),
    ("$chdir", 12),
    ("$time", 13),
    ("$chmod", 15),
    ("$lseek", 19),
    ("$getpid", 20),
    ("$kill", 37),
    ("$dup", 41),
    ("$pipe", 42),
    ("$brk", 45),
    ("$ioctl", 54),
    ("$dup2", 63),
    ("$gettimeofday", 78),
    ("$mmap", 90),
    ("$munmap", 91),
    ("$socketcall", 102),
    ("$nanosleep", 162),
];

/// Look up a syscall number by its `$name` spelling.
pub fn number(name: &str) -> Option<u32> {
    SYSCALL_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, num)| *num)
}

/// Longest table key that is a prefix of `text` (which starts at a `$`).
pub fn longest_match(text: &str) -> Option<&'static str> {
    SYSCALL_TABLE
        .iter()
        .filter(|(n, _)| text.starts_with(n))
        .map(|(n, _)| *n)
        .max_by_key(|n| n.len())
}
