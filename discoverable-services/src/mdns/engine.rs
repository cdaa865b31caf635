use std::sync::Arc;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo, UnregisterStatus};
use shared::protocol::MAX_SERVICE_NAME_LEN;

/// The slice of an mDNS responder the discovery and publication code relies on.
pub trait MdnsEngine: Send + Sync {
    fn browse(&self, service_type: &str) -> mdns_sd::Result<flume::Receiver<ServiceEvent>>;

    fn stop_browse(&self, service_type: &str) -> mdns_sd::Result<()>;

    fn register(&self, info: ServiceInfo) -> mdns_sd::Result<()>;

    /// The receiver yields once the goodbye for `fullname` has been sent
    fn unregister(&self, fullname: &str) -> mdns_sd::Result<flume::Receiver<UnregisterStatus>>;

    fn shutdown(&self) -> mdns_sd::Result<()>;
}

/// Creates a fresh engine instance. Each discovery call and each publishing
/// session owns the instance it creates.
pub type EngineFactory = Arc<dyn Fn() -> mdns_sd::Result<Arc<dyn MdnsEngine>> + Send + Sync>;

/// `MdnsEngine` backed by an `mdns_sd::ServiceDaemon`
pub struct MdnsSdEngine {
    daemon: ServiceDaemon,
}

impl MdnsSdEngine {
    pub fn new(daemon: ServiceDaemon) -> Self {
        Self { daemon }
    }

    /// Factory spawning a new daemon per engine.
    ///
    /// The daemon drops registrations with over-long type names without
    /// reporting an error, so its limit is raised to `MAX_SERVICE_NAME_LEN`
    /// and the publisher skips anything longer.
    pub fn factory() -> EngineFactory {
        Arc::new(|| {
            let daemon = ServiceDaemon::new()?;
            if let Err(e) = daemon.set_service_name_len_max(MAX_SERVICE_NAME_LEN) {
                let _ = daemon.shutdown();
                return Err(e);
            }
            Ok(Arc::new(MdnsSdEngine::new(daemon)) as Arc<dyn MdnsEngine>)
        })
    }
}

impl MdnsEngine for MdnsSdEngine {
    fn browse(&self, service_type: &str) -> mdns_sd::Result<flume::Receiver<ServiceEvent>> {
        self.daemon.browse(service_type)
    }

    fn stop_browse(&self, service_type: &str) -> mdns_sd::Result<()> {
        self.daemon.stop_browse(service_type)
    }

    fn register(&self, info: ServiceInfo) -> mdns_sd::Result<()> {
        self.daemon.register(info)
    }

    fn unregister(&self, fullname: &str) -> mdns_sd::Result<flume::Receiver<UnregisterStatus>> {
        self.daemon.unregister(fullname)
    }

    fn shutdown(&self) -> mdns_sd::Result<()> {
        // The status receiver only reports when the daemon thread exits
        self.daemon.shutdown().map(|_| ())
    }
}
