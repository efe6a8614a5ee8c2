//! Tracy profiler integration.
//!
//! With the `tracy` feature, pump cycles show up as zones when a Tracy
//! client is running. Without it, [`pump_zone`] is free.

/// Guard for an active profiler zone.
pub struct ProfilerZone {
    #[cfg(feature = "tracy")]
    _span: Option<tracy_client::Span>,
}

/// Open a zone around one `render_thread_update` cycle.
#[inline]
pub fn pump_zone() -> ProfilerZone {
    ProfilerZone {
        #[cfg(feature = "tracy")]
        _span: tracy_client::Client::running()
            .map(|client| client.span(tracy_client::span_location!("stagealloc::pump"), 0)),
    }
}

/// Plot the number of pending upload operations.
#[inline]
pub fn plot_pending(pending: usize) {
    #[cfg(feature = "tracy")]
    if let Some(client) = tracy_client::Client::running() {
        client.plot(tracy_client::plot_name!("stagealloc pending ops"), pending as f64);
    }

    #[cfg(not(feature = "tracy"))]
    let _ = pending;
}
