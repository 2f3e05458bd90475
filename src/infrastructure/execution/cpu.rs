//! CPU-time accounting for this process and for solver process groups.

use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeVal;
use nix::unistd::{sysconf, SysconfVar};
use std::fs;

fn timeval_seconds(tv: TimeVal) -> f64 {
    tv.tv_sec() as f64 + tv.tv_usec() as f64 / 1e6
}

fn rusage_seconds(who: UsageWho) -> Option<f64> {
    let usage = getrusage(who).ok()?;
    Some(timeval_seconds(usage.user_time()) + timeval_seconds(usage.system_time()))
}

/// User plus system CPU seconds consumed by this process.
pub fn self_cpu_seconds() -> Option<f64> {
    rusage_seconds(UsageWho::RUSAGE_SELF)
}

fn clock_ticks_per_second() -> Option<f64> {
    match sysconf(SysconfVar::CLK_TCK) {
        Ok(Some(ticks)) if ticks > 0 => Some(ticks as f64),
        _ => None,
    }
}

/// Fields of `/proc/<pid>/stat` the accounting needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcStat {
    pgrp: i64,
    /// utime + stime + cutime + cstime, in clock ticks
    ticks: u64,
}

fn parse_proc_stat(contents: &str) -> Option<ProcStat> {
    // The command name is parenthesized and may itself contain spaces.
    let rest = &contents[contents.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // fields[0] is the state (stat field 3)
    let pgrp = fields.get(2)?.parse().ok()?;
    let mut ticks = 0u64;
    for index in 11..=14 {
        let value: i64 = fields.get(index)?.parse().ok()?;
        ticks += u64::try_from(value).unwrap_or(0);
    }
    Some(ProcStat { pgrp, ticks })
}

/// Total CPU seconds of every live process in group `pgid`, including the
/// time of their reaped children.
///
/// Returns `None` where `/proc` is unavailable.
pub fn process_group_cpu_seconds(pgid: i32) -> Option<f64> {
    let ticks_per_second = clock_ticks_per_second()?;
    let entries = fs::read_dir("/proc").ok()?;
    let mut ticks = 0u64;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().filter(|n| n.bytes().all(|b| b.is_ascii_digit())) else {
            continue;
        };
        // Processes exit between listing and reading; skip them.
        let Ok(contents) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
            continue;
        };
        if let Some(stat) = parse_proc_stat(&contents) {
            if stat.pgrp == i64::from(pgid) {
                ticks += stat.ticks;
            }
        }
    }
    Some(ticks as f64 / ticks_per_second)
}
