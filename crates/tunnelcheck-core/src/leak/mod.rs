//! Leak and efficacy probes: DNS resolvers, IPv6 bypass, ad/tracker
//! DNS blocking.

pub mod adblock;
pub mod dns;
pub mod ipv6;
