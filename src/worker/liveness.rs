use sysinfo::{Pid, ProcessRefreshKind, System};

/// Liveness probe backed by the OS process table
pub struct LivenessProbe {
    /// System information collector
    system: System,
}

impl LivenessProbe {
    /// Create a new liveness probe
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }

    /// OS-reported start time of a pid, in seconds since the epoch
    ///
    /// Recorded at spawn time and compared on later probes to tell a
    /// recycled pid apart from the worker that was actually spawned.
    pub fn start_time(&mut self, pid: u32) -> Option<u64> {
        let sys_pid = Pid::from_u32(pid);
        self.refresh(sys_pid);
        self.system.process(sys_pid).map(|p| p.start_time())
    }

    /// Check whether a pid is alive and still the process we spawned
    ///
    /// A pid whose start time disagrees with the recorded one has been
    /// reused by the OS and counts as gone. A process the probe cannot see
    /// at all (permissions included) also counts as gone.
    pub fn is_alive(&mut self, pid: u32, expected_start_time: Option<u64>) -> bool {
        let sys_pid = Pid::from_u32(pid);
        self.refresh(sys_pid);

        match self.system.process(sys_pid) {
            Some(process) => match expected_start_time {
                Some(expected) => process.start_time() == expected,
                None => true,
            },
            None => false,
        }
    }

    fn refresh(&mut self, pid: Pid) {
        self.system.refresh_processes_specifics(
            sysinfo::ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
    }
}

impl Default for LivenessProbe {
    fn default() -> Self {
        Self::new()
    }
}
