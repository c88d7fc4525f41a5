use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use beanwire::prelude::*;
use beanwire::web::Dispatcher;
use serde::{Deserialize, Serialize};

mod example {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct Increment {
        by: i32,
    }

    #[derive(Debug, Serialize)]
    pub struct Total {
        total: i32,
    }

    pub struct ExampleController {
        value: AtomicI32,
    }

    #[component]
    #[controller]
    impl ExampleController {
        #[inject]
        pub fn new() -> Self {
            Self {
                value: AtomicI32::new(1),
            }
        }

        #[request_handle(method = GET, path = "/int")]
        fn int_method(&self) -> i32 {
            self.value.load(Ordering::SeqCst)
        }

        #[request_handle(method = GET, path = "/int2", produces = MediaType::TEXT_PLAIN)]
        fn int_method2(&self) -> String {
            format!("value is {}", self.value.load(Ordering::SeqCst))
        }

        #[request_handle(method = POST, path = "/int3")]
        fn int_method3(&self, request: &Request) -> Result<Total, serde_json::Error> {
            let by = request.json::<Increment>()?.map_or(0, |increment| increment.by);
            let total = self.value.fetch_add(by, Ordering::SeqCst) + by;
            Ok(Total { total })
        }

        #[request_handle(method = POST, path = "/void")]
        fn void_method(&self) {
            self.value.store(0, Ordering::SeqCst);
        }
    }

    fn handler<'a>(
        handlers: &'a [Arc<dyn RequestHandler>],
        path: &str,
    ) -> &'a Arc<dyn RequestHandler> {
        handlers
            .iter()
            .find(|handler| handler.path() == path)
            .unwrap()
    }

    #[test]
    fn controller_generates_one_handler_per_route() {
        let registry = get_instance!().unwrap();
        let handlers = registry.provide_all::<dyn RequestHandler>().unwrap();
        assert_eq!(handlers.len(), 4);

        let int = handler(&handlers, "/int");
        assert_eq!(int.method(), HttpMethod::Get);
        assert_eq!(int.produces(), MediaType::APPLICATION_JSON);

        let int2 = handler(&handlers, "/int2");
        assert_eq!(int2.produces(), MediaType::TEXT_PLAIN);

        let int3 = handler(&handlers, "/int3");
        assert_eq!(int3.method(), HttpMethod::Post);

        let void = handler(&handlers, "/void");
        let reply = void.process(&Request::new(HttpMethod::Post, "/void", None)).unwrap();
        assert_eq!(reply, Reply::Response(Response::no_content()));
    }

    #[test]
    fn handlers_share_the_controller() {
        let registry = get_instance!().unwrap();
        let dispatcher = Dispatcher::from_provider(&registry).unwrap();

        let request = Request::new(HttpMethod::Post, "/int3", Some(r#"{"by":41}"#.into()));
        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), Some(r#"{"total":42}"#));

        let response = dispatcher.dispatch(&Request::get("/int"));
        assert_eq!(response.body(), Some("42"));
        assert_eq!(response.content_type(), Some("application/json"));

        let response = dispatcher.dispatch(&Request::get("/int2"));
        assert_eq!(response.body(), Some("value is 42"));
        assert_eq!(response.content_type(), Some("text/plain"));
    }

    #[test]
    fn dispatcher_reports_failures_and_missing_routes() {
        let registry = get_instance!().unwrap();
        let dispatcher = Dispatcher::from_provider(&registry).unwrap();

        let request = Request::new(HttpMethod::Post, "/int3", Some("{".into()));
        let response = dispatcher.dispatch(&request);
        assert_eq!(response.status(), 500);
        assert_eq!(response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(response.body().unwrap()).unwrap();
        assert!(body["errorMessage"].is_string());

        assert_eq!(dispatcher.dispatch(&Request::get("/int3")).status(), 404);
        assert_eq!(dispatcher.dispatch(&Request::get("/missing")).status(), 404);

        let response = dispatcher.dispatch(&Request::new(HttpMethod::Post, "/void", None));
        assert_eq!(response.status(), 204);
        assert_eq!(response.body(), None);
    }
}

mod overloaded {
    use std::fmt::{Display, Formatter, Result as FmtResult};

    use super::*;

    #[derive(Debug)]
    pub struct Unavailable;

    impl Display for Unavailable {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            f.write_str("service unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    pub struct StatusController;

    #[controller]
    #[component]
    impl StatusController {
        #[inject]
        pub fn new() -> Self {
            Self
        }

        #[request_handle(method = GET, path = "/status")]
        #[request_handle(method = HEAD, path = "/status")]
        fn status(&self) -> Response {
            Response::new(Response::OK).with_body(MediaType::TEXT_PLAIN, "up")
        }

        #[request_handle(method = DELETE, path = "/status")]
        fn shutdown(&self) -> Result<(), Unavailable> {
            Err(Unavailable)
        }
    }

    #[test]
    fn repeated_markers_bind_the_same_method() {
        let registry = get_instance!().unwrap();
        let dispatcher = Dispatcher::from_provider(&registry).unwrap();
        assert_eq!(dispatcher.handlers().len(), 3);

        for method in [HttpMethod::Get, HttpMethod::Head] {
            let response = dispatcher.dispatch(&Request::new(method, "/status", None));
            assert_eq!(response.status(), 200);
            assert_eq!(response.body(), Some("up"));
        }

        let first = registry.provide::<StatusControllerStatus1Handler>().unwrap();
        let second = registry.provide::<StatusControllerStatus2Handler>().unwrap();
        assert_eq!(first.method(), HttpMethod::Get);
        assert_eq!(second.method(), HttpMethod::Head);
    }

    #[test]
    fn handler_errors_become_error_responses() {
        let registry = get_instance!().unwrap();
        let dispatcher = Dispatcher::from_provider(&registry).unwrap();

        let response = dispatcher.dispatch(&Request::new(HttpMethod::Delete, "/status", None));
        assert_eq!(response.status(), 500);
        assert_eq!(
            response.body(),
            Some(r#"{"errorMessage":"service unavailable"}"#)
        );
    }
}

mod ledger {
    use beanwire::transaction::BoxError;

    use super::*;

    pub trait Ledger: Send + Sync {
        fn post(&self) -> u32;
    }

    pub struct RefusingManager;

    #[component(dyn TransactionManager)]
    impl RefusingManager {
        #[inject]
        pub fn new() -> Self {
            Self
        }
    }

    impl TransactionManager for RefusingManager {
        fn begin(&self) -> Result<(), BoxError> {
            Ok(())
        }

        fn commit(&self) -> Result<(), BoxError> {
            Err("commit refused".into())
        }

        fn rollback(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    pub struct MemoryLedger {
        entries: AtomicI32,
    }

    #[component(dyn Ledger)]
    impl MemoryLedger {
        #[inject]
        pub fn new() -> Self {
            Self {
                entries: AtomicI32::new(0),
            }
        }
    }

    #[transactional]
    impl Ledger for MemoryLedger {
        #[transactional]
        fn post(&self) -> u32 {
            self.entries.fetch_add(1, Ordering::SeqCst) as u32 + 1
        }
    }

    pub struct LedgerController {
        ledger: Arc<dyn Ledger>,
    }

    #[component]
    #[controller]
    impl LedgerController {
        #[inject]
        pub fn new(ledger: Arc<dyn Ledger>) -> Self {
            Self { ledger }
        }

        #[request_handle(method = POST, path = "/entries")]
        fn post(&self) -> u32 {
            self.ledger.post()
        }
    }

    #[test]
    fn failed_commit_in_a_handler_becomes_an_error_response() {
        let registry = get_instance!().unwrap();
        let dispatcher = Dispatcher::from_provider(&registry).unwrap();

        let response = dispatcher.dispatch(&Request::new(HttpMethod::Post, "/entries", None));
        assert_eq!(response.status(), 500);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(
            response.body(),
            Some(r#"{"errorMessage":"could not commit the transaction around MemoryLedger::post"}"#)
        );
    }
}
