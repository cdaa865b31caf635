//! In-process stand-in for the mDNS network, used by tests.
//!
//! Engines created from one `SimulatedNetwork` see each other's registrations.
//! A browse immediately yields every matching registration, then keeps
//! receiving announcements and withdrawals until it is stopped or its engine
//! shuts down.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use mdns_sd::{ServiceEvent, ServiceInfo, UnregisterStatus};
use crate::mdns::engine::{EngineFactory, MdnsEngine};

struct ActiveBrowse {
    engine: usize,
    service_type: String,
    sender: flume::Sender<ServiceEvent>,
}

#[derive(Default)]
struct NetworkState {
    /// At most one registration per full instance name
    registrations: Vec<ServiceInfo>,
    browses: Vec<ActiveBrowse>,
    engines_created: usize,
    engines_shut_down: usize,
    browses_started: Vec<String>,
    fail_unregister: bool,
    rejected_browses: HashSet<String>,
    rejected_registrations: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct SimulatedNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> EngineFactory {
        let network = self.clone();
        Arc::new(move || {
            let id = {
                let mut state = network.lock();
                state.engines_created += 1;
                state.engines_created
            };
            Ok(Arc::new(SimulatedEngine {
                id,
                network: network.clone(),
            }) as Arc<dyn MdnsEngine>)
        })
    }

    /// Register an instance as if another host on the network advertised it
    pub fn announce(&self, info: ServiceInfo) {
        self.lock().add(info);
    }

    /// Remove an instance as if its host sent a goodbye
    pub fn withdraw(&self, fullname: &str) -> bool {
        self.lock().remove(fullname)
    }

    /// Make every subsequent unregister call fail
    pub fn fail_unregister(&self) {
        self.lock().fail_unregister = true;
    }

    /// Make browses of `service_type` fail to start
    pub fn reject_browse(&self, service_type: &str) {
        self.lock().rejected_browses.insert(service_type.to_string());
    }

    /// Make registration of `fullname` fail
    pub fn reject_registration(&self, fullname: &str) {
        self.lock().rejected_registrations.insert(fullname.to_string());
    }

    pub fn registered_fullnames(&self) -> Vec<String> {
        self.lock()
            .registrations
            .iter()
            .map(|info| info.get_fullname().to_string())
            .collect()
    }

    pub fn engines_created(&self) -> usize {
        self.lock().engines_created
    }

    pub fn engines_shut_down(&self) -> usize {
        self.lock().engines_shut_down
    }

    pub fn browses_started(&self) -> Vec<String> {
        self.lock().browses_started.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches(info: &ServiceInfo, service_type: &str) -> bool {
    info.get_type() == service_type || info.get_subtype().as_deref() == Some(service_type)
}

impl NetworkState {
    fn add(&mut self, info: ServiceInfo) {
        for browse in &self.browses {
            if matches(&info, &browse.service_type) {
                let _ = browse.sender.send(ServiceEvent::ServiceResolved(info.clone()));
            }
        }
        self.registrations.retain(|existing| existing.get_fullname() != info.get_fullname());
        self.registrations.push(info);
    }

    fn remove(&mut self, fullname: &str) -> bool {
        let Some(index) = self.registrations.iter().position(|info| info.get_fullname() == fullname) else {
            return false;
        };

        let info = self.registrations.remove(index);
        for browse in &self.browses {
            if matches(&info, &browse.service_type) {
                let _ = browse.sender.send(ServiceEvent::ServiceRemoved(
                    browse.service_type.clone(),
                    fullname.to_string(),
                ));
            }
        }
        true
    }
}

struct SimulatedEngine {
    id: usize,
    network: SimulatedNetwork,
}

impl MdnsEngine for SimulatedEngine {
    fn browse(&self, service_type: &str) -> mdns_sd::Result<flume::Receiver<ServiceEvent>> {
        let mut network = self.network.lock();
        if network.rejected_browses.contains(service_type) {
            return Err(mdns_sd::Error::Msg(format!("simulated failure browsing {}", service_type)));
        }

        let (tx, rx) = flume::unbounded();
        let _ = tx.send(ServiceEvent::SearchStarted(service_type.to_string()));

        network.browses_started.push(service_type.to_string());
        for info in &network.registrations {
            if matches(info, service_type) {
                let _ = tx.send(ServiceEvent::ServiceResolved(info.clone()));
            }
        }

        network.browses.push(ActiveBrowse {
            engine: self.id,
            service_type: service_type.to_string(),
            sender: tx,
        });
        Ok(rx)
    }

    fn stop_browse(&self, service_type: &str) -> mdns_sd::Result<()> {
        let mut network = self.network.lock();
        network.browses.retain(|browse| {
            let stopping = browse.engine == self.id && browse.service_type == service_type;
            if stopping {
                let _ = browse.sender.send(ServiceEvent::SearchStopped(service_type.to_string()));
            }
            !stopping
        });
        Ok(())
    }

    fn register(&self, info: ServiceInfo) -> mdns_sd::Result<()> {
        let mut network = self.network.lock();
        if network.rejected_registrations.contains(info.get_fullname()) {
            return Err(mdns_sd::Error::Msg(format!(
                "simulated failure registering {}",
                info.get_fullname()
            )));
        }
        network.add(info);
        Ok(())
    }

    fn unregister(&self, fullname: &str) -> mdns_sd::Result<flume::Receiver<UnregisterStatus>> {
        let mut network = self.network.lock();
        if network.fail_unregister {
            return Err(mdns_sd::Error::Msg(format!("simulated failure unregistering {}", fullname)));
        }

        let status = if network.remove(fullname) {
            UnregisterStatus::OK
        } else {
            UnregisterStatus::NotFound
        };

        let (tx, rx) = flume::bounded(1);
        let _ = tx.send(status);
        Ok(rx)
    }

    fn shutdown(&self) -> mdns_sd::Result<()> {
        let mut network = self.network.lock();
        network.browses.retain(|browse| browse.engine != self.id);
        network.engines_shut_down += 1;
        Ok(())
    }
}
