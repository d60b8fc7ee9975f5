mod ethernet_networks;
mod fc_networks;

pub use ethernet_networks::EthernetNetworks;
pub use fc_networks::FcNetworks;
