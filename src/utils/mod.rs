pub mod dns;
pub mod domain;
pub mod extract;
pub mod fetch;
pub mod resolver;
pub mod tabular;

#[cfg(test)]
pub(crate) mod test_server;
