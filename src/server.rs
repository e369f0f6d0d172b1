use crate::config::ServerConfig;
use crate::error::AppError;
use crate::http::{handle_connection, HandlerContext};
use crate::logger::Logger;
use log::{debug, error, info};
use rand::Rng;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use threadpool::ThreadPool;

/// How often the accept loop checks for a stop request while idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Schedules the handler for one accepted connection.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// One fresh thread per connection, with no upper bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPerConnection;

impl Dispatcher for ThreadPerConnection {
    fn dispatch(&self, job: Job) {
        if let Err(e) = thread::Builder::new()
            .name("connection".to_string())
            .spawn(job)
        {
            error!("Failed to spawn connection thread: {e}");
        }
    }
}

/// Connections share a fixed number of worker threads; extra ones queue.
pub struct PooledDispatcher {
    pool: Mutex<ThreadPool>,
}

impl PooledDispatcher {
    pub fn new(threads: usize) -> Self {
        Self {
            pool: Mutex::new(ThreadPool::new(threads.max(1))),
        }
    }
}

impl Dispatcher for PooledDispatcher {
    fn dispatch(&self, job: Job) {
        self.pool
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .execute(job);
    }
}

#[derive(Default)]
struct ServerState {
    running: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
    accept_thread: Option<JoinHandle<()>>,
}

impl ServerState {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A static file server that can be started and stopped repeatedly.
pub struct Server {
    logger: Arc<Logger>,
    dispatcher: Arc<dyn Dispatcher>,
    state: Mutex<ServerState>,
}

impl Server {
    /// A server dispatching each connection onto its own thread.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::with_dispatcher(logger, Arc::new(ThreadPerConnection))
    }

    pub fn with_dispatcher(logger: Arc<Logger>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            logger,
            dispatcher,
            state: Mutex::new(ServerState::default()),
        }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_running()
    }

    /// Address of the listening socket while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_state().local_addr
    }

    /// Binds the configured port and starts accepting connections in the
    /// background. Does nothing if the server is already running.
    pub fn start(&self, config: &ServerConfig) -> Result<(), AppError> {
        let mut state = self.lock_state();
        if state.is_running() {
            debug!("Start requested while already running; ignoring");
            return Ok(());
        }

        let config = config.validated().inspect_err(|e| {
            self.logger.log(format!("Error starting server: {e}"));
        })?;
        self.logger.set_log_dir(&config.log_dir);

        let listener = self.bind(&config)?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let ctx = Arc::new(HandlerContext {
            web_root: config.web_root.clone(),
            logger: Arc::clone(&self.logger),
            read_timeout: config.read_timeout,
        });
        let accept_thread = {
            let running = Arc::clone(&running);
            let dispatcher = Arc::clone(&self.dispatcher);
            thread::Builder::new()
                .name("accept-loop".to_string())
                .spawn(move || accept_loop(listener, running, ctx, dispatcher))?
        };

        *state = ServerState {
            running,
            local_addr: Some(local_addr),
            accept_thread: Some(accept_thread),
        };

        info!(
            "Server listening on {} for directory '{}'",
            local_addr,
            config.web_root.display()
        );
        self.logger
            .log(format!("Server started on port {}", local_addr.port()));
        Ok(())
    }

    fn bind(&self, config: &ServerConfig) -> Result<TcpListener, AppError> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .and_then(|listener| listener.set_nonblocking(true).map(|()| listener))
            .map_err(|source| AppError::Bind { address, source })
            .inspect_err(|e| self.logger.log(format!("Error starting server: {e}")))?;
        Ok(listener)
    }

    /// Stops accepting connections and closes the listening socket. In-flight
    /// connections finish on their own. Calling it while stopped is a no-op.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if !state.is_running() {
            return;
        }
        state.running.store(false, Ordering::SeqCst);
        state.local_addr = None;

        // The accept loop owns the listener; joining it closes the socket.
        if let Some(handle) = state.accept_thread.take() {
            if handle.join().is_err() {
                error!("Accept loop panicked");
            }
        }
        self.logger.log("Server stopped");
    }

    /// Blocks until the server is stopped from another thread.
    pub fn wait(&self) {
        while self.is_running() {
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    ctx: Arc<HandlerContext>,
    dispatcher: Arc<dyn Dispatcher>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let ctx = Arc::clone(&ctx);
                let log_prefix = format!("[ReqID: {}][Peer: {peer}]", generate_request_id());
                dispatcher.dispatch(Box::new(move || {
                    handle_connection(stream, peer, &ctx, &log_prefix);
                }));
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                ctx.logger.log(format!("Error accepting connection: {e}"));
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    debug!("Accept loop exited");
}

fn generate_request_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}
