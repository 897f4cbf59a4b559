//! Connection handler that admits framed jobs and answers them.
//!
//! Each accepted connection runs on its own thread and may carry any number
//! of sequential exchanges. Requests naming an unregistered handler are
//! answered immediately without touching the queue; everything else is
//! pushed to the [`BatchQueue`] and the thread blocks until the worker
//! settles the job.

use std::sync::Arc;
use std::time::Instant;

use offload_protocol::{Framed, JobRequest, JobResponse};
use tracing::{debug, warn};

use crate::sinks::{DataRecord, DataSink};
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::DISPATCH_TARGET;
use super::queue::BatchQueue;
use super::registry::HandlerRegistry;

/// Serves the job protocol on accepted connections.
pub struct DispatchConnectionHandler {
    queue: Arc<BatchQueue>,
    registry: Arc<HandlerRegistry>,
    data: Arc<dyn DataSink>,
}

impl DispatchConnectionHandler {
    /// Creates a handler feeding `queue` and checking names against
    /// `registry`.
    pub fn new(
        queue: Arc<BatchQueue>,
        registry: Arc<HandlerRegistry>,
        data: Arc<dyn DataSink>,
    ) -> Self {
        Self {
            queue,
            registry,
            data,
        }
    }

    /// Runs one request through admission and waits for its outcome.
    pub fn respond(&self, request: JobRequest) -> JobResponse {
        let JobRequest { handler, payload } = request;
        if !self.registry.contains(&handler) {
            debug!(
                target: DISPATCH_TARGET,
                handler = %handler,
                "rejecting unknown handler"
            );
            return JobResponse::failure(self.registry.unknown_handler_message(&handler));
        }

        let input: Arc<[u8]> = Arc::from(payload);
        let started = Instant::now();
        let outcome = self.queue.push(handler.as_str(), Arc::clone(&input)).wait();
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(output) => {
                let record = DataRecord {
                    handler: &handler,
                    input: &input,
                    output: &output,
                };
                if let Err(error) = self.data.record(&record) {
                    warn!(
                        target: DISPATCH_TARGET,
                        %error,
                        handler = %handler,
                        "failed to record request data"
                    );
                }
                JobResponse::Success { output, elapsed }
            }
            Err(failure) => JobResponse::failure(failure.message()),
        }
    }

    fn serve(&self, stream: ConnectionStream) {
        let mut framed = Framed::new(stream);
        loop {
            let request = match JobRequest::read_from(&mut framed) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client closed connection");
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    return;
                }
            };
            let response = self.respond(request);
            if let Err(error) = response.write_to(&mut framed) {
                warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                return;
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::compute::BuiltinHandlerFactory;
    use crate::sinks::TracingDataSink;

    #[fixture]
    fn handler() -> Arc<DispatchConnectionHandler> {
        let registry = Arc::new(HandlerRegistry::new(Arc::new(BuiltinHandlerFactory)));
        registry.load("echo").expect("builtin");
        registry.load("sha256").expect("builtin");
        Arc::new(DispatchConnectionHandler::new(
            Arc::new(BatchQueue::new()),
            registry,
            Arc::new(TracingDataSink),
        ))
    }

    #[rstest]
    fn unknown_handler_is_rejected_without_queueing(handler: Arc<DispatchConnectionHandler>) {
        let response = handler.respond(JobRequest {
            handler: "fft".to_owned(),
            payload: b"data".to_vec(),
        });
        assert_eq!(
            response,
            JobResponse::failure("invalid handler name: fft; valid handlers: echo, sha256.")
        );
        assert!(handler.queue.is_empty());
    }

    #[rstest]
    fn connection_serves_sequential_exchanges(handler: Arc<DispatchConnectionHandler>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept");
                handler.handle(ConnectionStream::Tcp(stream));
            })
        };

        let mut client = Framed::new(TcpStream::connect(addr).expect("connect"));
        offload_protocol::write_request(&mut client, "missing", b"").expect("first request");
        assert!(matches!(
            JobResponse::read_from(&mut client).expect("first response"),
            JobResponse::Failure { .. }
        ));
        handler.queue.interrupt();
        offload_protocol::write_request(&mut client, "echo", b"again").expect("second request");
        assert_eq!(
            JobResponse::read_from(&mut client).expect("second response"),
            JobResponse::failure("server stopped")
        );
        drop(client);
        server.join().expect("server thread");
    }

    #[rstest]
    fn client_receives_a_rejection_for_an_oversized_unknown_name(
        handler: Arc<DispatchConnectionHandler>,
    ) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept");
                handler.handle(ConnectionStream::Tcp(stream));
            })
        };

        let name = "x".repeat(65_500);
        let endpoint = offload_config::SocketEndpoint::tcp("127.0.0.1", port);
        let mut client = offload_protocol::OffloadClient::connect(&endpoint).expect("connect");
        let message = match client.submit(&name, b"data") {
            Err(offload_protocol::ClientError::Rejected { message }) => message,
            other => panic!("expected a rejection, got {other:?}"),
        };
        assert!(message.starts_with("invalid handler name: xxx"));
        assert_eq!(message.len(), offload_protocol::FrameLimits::default().max_string);
        drop(client);
        server.join().expect("server thread");
    }
}
