use beanwire::prelude::*;
use beanwire::web::{Dispatcher, HandlerError};

pub struct Api;

#[controller]
#[component]
impl Api {
    #[inject]
    fn new() -> Self {
        Self
    }

    #[request_handle(method = get, path = "/unit")]
    fn unit(&self) {}

    #[request_handle(method = Get, path = "/value")]
    fn value(&self) -> Vec<u8> {
        vec![1, 2]
    }

    #[request_handle(method = PUT, path = "/echo", produces = "text/plain")]
    fn echo(&self, request: &Request) -> Result<String, HandlerError> {
        request
            .body()
            .map(str::to_owned)
            .ok_or_else(|| HandlerError::failed("empty body"))
    }

    #[request_handle(method = PATCH, path = "/raw")]
    fn raw(&self, _request: &beanwire::web::Request) -> Result<Response, std::io::Error> {
        Ok(Response::no_content())
    }

    #[request_handle(method = OPTIONS)]
    fn root(&self) -> Result<(), std::fmt::Error> {
        Ok(())
    }
}

fn main() {
    let registry = get_instance!().unwrap();
    let dispatcher = Dispatcher::from_provider(&registry).unwrap();
    assert_eq!(dispatcher.handlers().len(), 5);

    let request = Request::new(HttpMethod::Put, "/echo", Some("hi".into()));
    assert_eq!(dispatcher.dispatch(&request).body(), Some("hi"));
    assert_eq!(dispatcher.dispatch(&Request::get("/value")).body(), Some("[1,2]"));
}
