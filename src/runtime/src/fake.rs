//! In-memory runtime for pipeline tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use a3s_ferry_core::archive::guess_reference;
use a3s_ferry_core::runtime::{CommandOutput, ContainerRuntime, LoadOutcome};
use async_trait::async_trait;

#[derive(Debug, Default)]
struct State {
    present: HashSet<String>,
    dangling: Vec<String>,
    calls: Vec<String>,
    remote_pulls: usize,
    archive_writes: usize,
}

/// Runtime double with the same skip rules as the CLI gateway: present
/// images are not pulled again and non-empty archives are not rewritten.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
    failing_pulls: HashSet<String>,
    failing_loads: HashSet<String>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_present(self, reference: &str) -> Self {
        self.state.lock().unwrap().present.insert(reference.to_string());
        self
    }

    pub fn with_dangling(self, id: &str) -> Self {
        self.state.lock().unwrap().dangling.push(id.to_string());
        self
    }

    pub fn failing_pull(mut self, reference: &str) -> Self {
        self.failing_pulls.insert(reference.to_string());
        self
    }

    /// Make `load` fail for archives with this file name.
    pub fn failing_load(mut self, file_name: &str) -> Self {
        self.failing_loads.insert(file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn remote_pulls(&self) -> usize {
        self.state.lock().unwrap().remote_pulls
    }

    pub fn archive_writes(&self) -> usize {
        self.state.lock().unwrap().archive_writes
    }

    pub fn is_present(&self, reference: &str) -> bool {
        self.state.lock().unwrap().present.contains(reference)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_available(&self) -> CommandOutput {
        CommandOutput::ok("fake 1.0")
    }

    async fn exists_locally(&self, reference: &str) -> bool {
        self.record(format!("inspect {reference}"));
        self.is_present(reference)
    }

    async fn pull(&self, reference: &str) -> CommandOutput {
        if self.exists_locally(reference).await {
            return CommandOutput::ok(format!("{reference} already present locally"));
        }
        self.record(format!("pull {reference}"));
        if self.failing_pulls.contains(reference) {
            return CommandOutput::failed(format!("{reference}: manifest unknown"));
        }
        let mut state = self.state.lock().unwrap();
        state.remote_pulls += 1;
        state.present.insert(reference.to_string());
        CommandOutput::ok(format!("pulled {reference}"))
    }

    async fn save_to_file(&self, reference: &str, path: &Path) -> CommandOutput {
        if std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false) {
            return CommandOutput::ok(format!("{} already exists", path.display()));
        }
        self.record(format!("save {reference}"));
        if let Err(e) = std::fs::write(path, format!("archive:{reference}")) {
            return CommandOutput::failed(e.to_string());
        }
        self.state.lock().unwrap().archive_writes += 1;
        CommandOutput::ok("")
    }

    async fn load_from_file(&self, path: &Path) -> LoadOutcome {
        self.record(format!("load {}", path.display()));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let image = std::fs::read_to_string(path)
            .ok()
            .and_then(|c| c.strip_prefix("archive:").map(str::to_string))
            .or_else(|| guess_reference(path))
            .unwrap_or_else(|| "unknown".to_string());

        if self.failing_loads.contains(&file_name) {
            return LoadOutcome {
                image,
                output: CommandOutput::failed("archive/tar: invalid tar header"),
            };
        }
        self.state.lock().unwrap().present.insert(image.clone());
        LoadOutcome {
            output: CommandOutput::ok(format!("Loaded image: {image}")),
            image,
        }
    }

    async fn list_images(&self) -> CommandOutput {
        let mut present: Vec<_> = self.state.lock().unwrap().present.iter().cloned().collect();
        present.sort();
        CommandOutput::ok(present.join("\n"))
    }

    async fn list_dangling(&self) -> CommandOutput {
        CommandOutput::ok(self.state.lock().unwrap().dangling.join("\n"))
    }

    async fn remove_images(&self, references: &[String]) -> CommandOutput {
        self.record(format!("rmi {}", references.join(" ")));
        let mut state = self.state.lock().unwrap();
        state.dangling.retain(|id| !references.contains(id));
        CommandOutput::ok("")
    }
}
