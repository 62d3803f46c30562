//! Test doubles for bootstrap workflow scenarios.

use std::sync::{Arc, Mutex};

use bosun::backend::BackendFuture;
use bosun::{
    Backend, InstanceHandle, InstanceNetworking, InstanceRequest, SecurityGroupOutcome, ServerQuery,
};
use thiserror::Error;

/// Instance identifier handed out by the scripted backend.
pub const INSTANCE_ID: &str = "i-123456";

/// Public address every scripted server is reachable on.
pub const SERVER_ADDRESS: &str = "ec2-203-0-113-10.compute-1.amazonaws.com";

/// Scripted backend that simulates the EC2 calls the bootstrap workflow makes.
#[derive(Clone, Debug)]
pub struct ScriptedEc2Backend {
    state: Arc<Mutex<State>>,
}

#[derive(Clone, Copy, Debug)]
enum FailureMode {
    EnsureGroup,
    Launch,
    Wait,
    Discovery,
}

impl FailureMode {
    const fn flag(self) -> u8 {
        match self {
            Self::EnsureGroup => 0b0001,
            Self::Launch => 0b0010,
            Self::Wait => 0b0100,
            Self::Discovery => 0b1000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Failures(u8);

impl Failures {
    const fn set(&mut self, mode: FailureMode) {
        self.0 |= mode.flag();
    }

    const fn contains(self, mode: FailureMode) -> bool {
        self.0 & mode.flag() != 0
    }
}

#[derive(Debug)]
struct State {
    failures: Failures,
    group_preexists: bool,
    discovered_address: Option<String>,
    operations: Vec<String>,
    ensured_groups: Vec<(String, String)>,
    launch_requests: Vec<InstanceRequest>,
    queries: Vec<ServerQuery>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            failures: Failures::default(),
            group_preexists: false,
            discovered_address: Some(SERVER_ADDRESS.to_owned()),
            operations: Vec::new(),
            ensured_groups: Vec::new(),
            launch_requests: Vec::new(),
            queries: Vec::new(),
        }
    }
}

impl ScriptedEc2Backend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn fail_ensure_group(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: fail_ensure_group: {err}"))
            .failures
            .set(FailureMode::EnsureGroup);
    }

    pub fn fail_launch(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: fail_launch: {err}"))
            .failures
            .set(FailureMode::Launch);
    }

    pub fn fail_wait(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: fail_wait: {err}"))
            .failures
            .set(FailureMode::Wait);
    }

    pub fn fail_discovery(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: fail_discovery: {err}"))
            .failures
            .set(FailureMode::Discovery);
    }

    pub fn group_already_exists(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: group_already_exists: {err}"))
            .group_preexists = true;
    }

    pub fn no_server_found(&self) {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: no_server_found: {err}"))
            .discovered_address = None;
    }

    pub fn operations(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: operations: {err}"))
            .operations
            .clone()
    }

    pub fn ensured_groups(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: ensured_groups: {err}"))
            .ensured_groups
            .clone()
    }

    pub fn launch_requests(&self) -> Vec<InstanceRequest> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: launch_requests: {err}"))
            .launch_requests
            .clone()
    }

    pub fn queries(&self) -> Vec<ServerQuery> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: queries: {err}"))
            .queries
            .clone()
    }
}

/// Errors raised by the scripted backend to model failure points.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedBackendError {
    #[error("security group failure")]
    Group,
    #[error("launch failure")]
    Launch,
    #[error("wait failure")]
    Wait,
    #[error("discovery failure")]
    Discovery,
}

impl Backend for ScriptedEc2Backend {
    type Error = ScriptedBackendError;

    fn ensure_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> BackendFuture<'a, SecurityGroupOutcome, Self::Error> {
        Box::pin(async move {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("lock poisoned in ensure_security_group: {err}"));
            state.operations.push(String::from("ensure_security_group"));
            state
                .ensured_groups
                .push((name.to_owned(), description.to_owned()));
            if state.failures.contains(FailureMode::EnsureGroup) {
                return Err(ScriptedBackendError::Group);
            }
            if state.group_preexists {
                Ok(SecurityGroupOutcome::AlreadyExists)
            } else {
                Ok(SecurityGroupOutcome::Created)
            }
        })
    }

    fn create<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, InstanceHandle, Self::Error> {
        Box::pin(async move {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("lock poisoned in create: {err}"));
            state.operations.push(String::from("create"));
            state.launch_requests.push(request.clone());
            if state.failures.contains(FailureMode::Launch) {
                return Err(ScriptedBackendError::Launch);
            }
            Ok(InstanceHandle {
                id: String::from(INSTANCE_ID),
            })
        })
    }

    fn wait_for_ready<'a>(
        &'a self,
        _handle: &'a InstanceHandle,
    ) -> BackendFuture<'a, InstanceNetworking, Self::Error> {
        Box::pin(async move {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("lock poisoned in wait_for_ready: {err}"));
            state.operations.push(String::from("wait_for_ready"));
            if state.failures.contains(FailureMode::Wait) {
                return Err(ScriptedBackendError::Wait);
            }
            Ok(InstanceNetworking {
                host: SERVER_ADDRESS.to_owned(),
                ssh_port: 22,
            })
        })
    }

    fn find_server_address<'a>(
        &'a self,
        query: &'a ServerQuery,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("lock poisoned in find_server_address: {err}"));
            state.operations.push(String::from("find_server_address"));
            state.queries.push(query.clone());
            if state.failures.contains(FailureMode::Discovery) {
                return Err(ScriptedBackendError::Discovery);
            }
            Ok(state.discovered_address.clone())
        })
    }
}
