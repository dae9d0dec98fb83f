#![cfg(test)]

mod gossip_integration_test;
