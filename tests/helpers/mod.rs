pub mod fake_relay;
