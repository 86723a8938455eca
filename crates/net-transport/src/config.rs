//! Transport configuration

use std::time::Duration;

use shared_protocol::{LowerTransport, TransportSettings};

/// Options applied to one outbound connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Container/protocol name, e.g. `rtsp`
    pub format: String,
    /// RTSP lower transport
    pub lower_transport: LowerTransport,
    /// Bound on connect and socket IO
    pub io_timeout: Duration,
    /// Maximum mux delay in microseconds
    pub mux_delay_us: u64,
    /// Initial mux preload in microseconds
    pub mux_preload_us: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from(&TransportSettings::default())
    }
}

impl From<&TransportSettings> for TransportConfig {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            format: settings.format.clone(),
            lower_transport: settings.lower_transport,
            io_timeout: Duration::from_millis(settings.io_timeout_ms),
            mux_delay_us: settings.mux_delay_us,
            mux_preload_us: settings.mux_preload_us,
        }
    }
}

impl TransportConfig {
    /// Options set directly on the muxer before the stream is declared
    pub fn muxer_options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rtsp_transport", self.lower_transport.as_str().to_string()),
            ("muxdelay", self.mux_delay_us.to_string()),
            ("muxpreload", self.mux_preload_us.to_string()),
        ]
    }

    /// Options passed with the header write (handshake)
    pub fn header_options(&self) -> Vec<(&'static str, String)> {
        let timeout_us = self.io_timeout.as_micros().to_string();
        let mut options = self.muxer_options();
        options.push(("stimeout", timeout_us.clone()));
        options.push(("timeout", timeout_us));
        options
    }
}
