//! Best-effort resident memory sampling for child processes.

/// Resident set size of `pid` in bytes, or `None` where unsupported or unreadable.
#[must_use]
pub fn resident_memory_bytes(pid: u32) -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        linux_resident_memory_bytes(pid)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        None
    }
}

#[cfg(target_os = "linux")]
fn linux_resident_memory_bytes(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    parse_vm_rss_kib(&status).map(|kib| kib.saturating_mul(1024))
}

#[cfg(any(target_os = "linux", test))]
fn parse_vm_rss_kib(proc_status: &str) -> Option<u64> {
    // /proc/<pid>/status: "VmRSS:\t   12345 kB"
    proc_status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmRSS:")?;
        rest.split_whitespace().next()?.parse::<u64>().ok()
    })
}
