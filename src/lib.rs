pub mod mac;
pub mod net;
pub mod proto;
pub mod sim;
pub mod topo;
pub mod viz;

#[cfg(test)]
mod test;
