#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use traffic_watcher::errors::RunnerError;
use traffic_watcher::models::Endpoint;
use traffic_watcher::runner::{CommandOutput, CommandRunner};

pub const TCP_RESULT: &str = "[  3]  0.0- 5.0 sec  28.6 MBytes  48.0 Mbits/sec";
pub const UDP_RESULT: &str = "[  3]  0.0- 5.0 sec  2.98 MBytes  5.00 Mbits/sec";

/// What a scripted client invocation returns
#[derive(Clone)]
pub enum ClientScript {
    Output(String),
    Exit { status: i32, output: String },
    /// The client hangs after printing the given text
    Timeout(String),
}

/// Fake command runner that answers from a script and records every call
pub struct ScriptedRunner {
    pub listening: bool,
    clients: HashMap<String, ClientScript>,
    counters: Mutex<HashMap<String, VecDeque<Option<(u64, u64)>>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            listening: true,
            clients: HashMap::new(),
            counters: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn not_listening(mut self) -> Self {
        self.listening = false;
        self
    }

    /// Scripts the client output of probes sourced at `endpoint`
    pub fn client(mut self, endpoint: &str, script: ClientScript) -> Self {
        self.clients.insert(endpoint.to_string(), script);
        self
    }

    /// Queues counter readings for `endpoint`; `None` yields a table without eth0
    pub fn counters(self, endpoint: &str, readings: Vec<Option<(u64, u64)>>) -> Self {
        self.counters
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), readings.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter(|(_, command)| command.contains(needle))
            .collect()
    }
}

pub fn net_dev(interface: &str, rx: u64, tx: u64) -> String {
    format!(
        "Inter-|   Receive                                                |  Transmit\n \
face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
lo:       0       0    0    0    0     0          0         0        0       0    0    0    0     0       0          0\n\
{interface}: {rx} 100 0 0 0 0 0 0 {tx} 100 0 0 0 0 0 0\n"
    )
}

pub fn endpoints(names: &[&str]) -> Vec<Endpoint> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Endpoint::new(*name, format!("10.0.0.{}/24", i + 1)))
        .collect()
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, endpoint: &str, command: &str) -> Result<CommandOutput, RunnerError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), command.to_string()));

        let ok = |text: String| {
            Ok(CommandOutput {
                status: Some(0),
                text,
            })
        };

        if command.starts_with("ss ") {
            let text = if self.listening {
                "tcp LISTEN 0 5 0.0.0.0:5001 0.0.0.0:*\n".to_string()
            } else {
                String::new()
            };
            return ok(text);
        }

        if command.starts_with("pkill") {
            return ok(String::new());
        }

        if command.starts_with("cat ") {
            let reading = self
                .counters
                .lock()
                .unwrap()
                .get_mut(endpoint)
                .and_then(|queue| queue.pop_front());
            return match reading {
                Some(Some((rx, tx))) => ok(net_dev(&format!("{endpoint}-eth0"), rx, tx)),
                Some(None) => ok(net_dev("wlan0", 1, 1)),
                None => Err(RunnerError::NonZeroExit {
                    endpoint: endpoint.to_string(),
                    status: Some(1),
                    output: "cat: no such file".to_string(),
                }),
            };
        }

        if command.contains(" -s -p ") {
            return ok(String::new());
        }

        if command.contains(" -c ") {
            return match self.clients.get(endpoint) {
                Some(ClientScript::Output(text)) => ok(text.clone()),
                Some(ClientScript::Exit { status, output }) => Err(RunnerError::NonZeroExit {
                    endpoint: endpoint.to_string(),
                    status: Some(*status),
                    output: output.clone(),
                }),
                Some(ClientScript::Timeout(output)) => Err(RunnerError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_secs: 30,
                    output: output.clone(),
                }),
                None => ok(String::new()),
            };
        }

        ok(String::new())
    }
}
