//! Socket-Zustand → Netzwerk-Events
//!
//! Ein TCP-Stack ohne Callbacks (smoltcp) meldet nur Zustände. Die Funktionen
//! hier entscheiden anhand des gemeldeten Zustands und der zuletzt erreichten
//! `SocketPhase`, welches `NetEvent` als nächstes fällig ist. Sie sind rein
//! und damit ohne Hardware testbar; der Adapter im Firmware-Crate bildet nur
//! noch den Stack-Zustand auf `SocketView` ab.

/// TCP-Zustand nach RFC 793, wie ihn der Stack meldet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TcpState {
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
}

impl TcpState {
    /// Handshake noch nicht abgeschlossen
    pub fn is_handshake(self) -> bool {
        matches!(self, TcpState::SynSent | TcpState::SynReceived)
    }
}

/// Momentaufnahme eines Sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketView {
    pub state: TcpState,
    /// Empfangspuffer enthält Daten
    pub can_recv: bool,
    /// Gegenseite kann noch Daten liefern
    pub may_recv: bool,
}

/// Lebenszyklus eines Sockets aus Sicht der Events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketPhase {
    /// Server: lauscht auf dem Port. Client: frei
    Idle,
    /// Verbindungsaufbau läuft (nur Client)
    Connecting,
    /// Verbindung gemeldet, Daten werden durchgereicht
    Open,
    /// `Closed`/`Error` ist raus, wartet auf close() oder abort()
    Finished,
    /// Vom Core freigegeben, wird wieder auf Listen gesetzt (nur Server)
    Released,
}

/// Nächster Schritt für einen Socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStep {
    /// Nichts zu melden
    Wait,
    Accepted,
    Connected,
    /// Empfangspuffer auslesen und als `Received` melden
    Receive,
    /// Gegenseite hat geschlossen
    Closed,
    /// Reset, Timeout oder abgelehnter Verbindungsaufbau
    Error,
}

/// Was mit einem freigegebenen Server-Socket passiert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recycle {
    /// Abbau läuft noch
    Wait,
    /// Hart beenden, danach wieder lauschen
    Abort,
    Relisten,
}

/// Server-Socket: Accept erst nach abgeschlossenem Handshake
pub fn server_step(phase: SocketPhase, view: SocketView) -> (SocketPhase, LinkStep) {
    match phase {
        SocketPhase::Idle => match view.state {
            TcpState::Listen | TcpState::Closed => (phase, LinkStep::Wait),
            state if state.is_handshake() && !view.can_recv => (phase, LinkStep::Wait),
            _ => (SocketPhase::Open, LinkStep::Accepted),
        },
        SocketPhase::Open => stream_step(view),
        _ => (phase, LinkStep::Wait),
    }
}

/// Client-Socket: `Connected` sobald der Handshake durch ist
pub fn client_step(phase: SocketPhase, view: SocketView) -> (SocketPhase, LinkStep) {
    match phase {
        SocketPhase::Connecting => match view.state {
            state if state.is_handshake() => (phase, LinkStep::Wait),
            TcpState::Closed => (SocketPhase::Finished, LinkStep::Error),
            _ => (SocketPhase::Open, LinkStep::Connected),
        },
        SocketPhase::Open => stream_step(view),
        _ => (phase, LinkStep::Wait),
    }
}

/// Daten, Close oder Fehler einer gemeldeten Verbindung
fn stream_step(view: SocketView) -> (SocketPhase, LinkStep) {
    if view.can_recv {
        return (SocketPhase::Open, LinkStep::Receive);
    }

    match view.state {
        // Ohne eigenes close() wird Closed nur per RST oder Timeout erreicht
        TcpState::Closed => (SocketPhase::Finished, LinkStep::Error),
        state if state.is_handshake() => (SocketPhase::Open, LinkStep::Wait),
        _ if !view.may_recv => (SocketPhase::Finished, LinkStep::Closed),
        _ => (SocketPhase::Open, LinkStep::Wait),
    }
}

/// Freigegebener Server-Socket: wieder lauschen, sobald der Abbau fertig ist
///
/// Ein Peer, der sein FIN nie schickt, hält den Socket sonst für immer in
/// FinWait2. Nach `linger_ms` wird deshalb abgebrochen.
pub fn recycle_step(state: TcpState, released_ms: u64, now_ms: u64, linger_ms: u64) -> Recycle {
    match state {
        TcpState::Closed => Recycle::Relisten,
        TcpState::TimeWait => Recycle::Abort,
        _ if now_ms.saturating_sub(released_ms) >= linger_ms => Recycle::Abort,
        _ => Recycle::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(state: TcpState, can_recv: bool, may_recv: bool) -> SocketView {
        SocketView {
            state,
            can_recv,
            may_recv,
        }
    }

    /// Wendet die Schritte an, bis nichts mehr zu melden ist
    fn drain_server(mut phase: SocketPhase, view: SocketView) -> (SocketPhase, [LinkStep; 2]) {
        let mut steps = [LinkStep::Wait; 2];
        for step in steps.iter_mut() {
            let (next, s) = server_step(phase, view);
            phase = next;
            *step = s;
        }
        (phase, steps)
    }

    #[test]
    fn test_listening_socket_reports_nothing() {
        let (phase, step) = server_step(SocketPhase::Idle, view(TcpState::Listen, false, false));
        assert_eq!(phase, SocketPhase::Idle);
        assert_eq!(step, LinkStep::Wait);
    }

    #[test]
    fn test_syn_received_is_not_accepted_yet() {
        // SYN verarbeitet, Handshake offen: weder Accept noch Close
        let (phase, steps) = drain_server(SocketPhase::Idle, view(TcpState::SynReceived, false, false));
        assert_eq!(phase, SocketPhase::Idle);
        assert_eq!(steps, [LinkStep::Wait, LinkStep::Wait]);
    }

    #[test]
    fn test_established_is_accepted_and_stays_open() {
        let (phase, steps) = drain_server(SocketPhase::Idle, view(TcpState::Established, false, true));
        assert_eq!(phase, SocketPhase::Open);
        assert_eq!(steps, [LinkStep::Accepted, LinkStep::Wait]);
    }

    #[test]
    fn test_request_in_same_poll_as_handshake() {
        let (phase, steps) = drain_server(SocketPhase::Idle, view(TcpState::Established, true, true));
        assert_eq!(phase, SocketPhase::Open);
        assert_eq!(steps, [LinkStep::Accepted, LinkStep::Receive]);
    }

    #[test]
    fn test_request_then_fin_is_accepted_before_close() {
        // Peer hat GET + FIN geschickt, bevor der Adapter nachgesehen hat
        let (_, steps) = drain_server(SocketPhase::Idle, view(TcpState::CloseWait, true, true));
        assert_eq!(steps, [LinkStep::Accepted, LinkStep::Receive]);

        let (phase, step) = server_step(SocketPhase::Open, view(TcpState::CloseWait, false, false));
        assert_eq!(phase, SocketPhase::Finished);
        assert_eq!(step, LinkStep::Closed);
    }

    #[test]
    fn test_open_socket_in_handshake_is_not_closed() {
        let (phase, step) = server_step(SocketPhase::Open, view(TcpState::SynReceived, false, false));
        assert_eq!(phase, SocketPhase::Open);
        assert_eq!(step, LinkStep::Wait);
    }

    #[test]
    fn test_reset_reports_error() {
        let (phase, step) = server_step(SocketPhase::Open, view(TcpState::Closed, false, false));
        assert_eq!(phase, SocketPhase::Finished);
        assert_eq!(step, LinkStep::Error);
    }

    #[test]
    fn test_finished_and_released_report_nothing() {
        for phase in [SocketPhase::Finished, SocketPhase::Released] {
            let (next, step) = server_step(phase, view(TcpState::CloseWait, true, true));
            assert_eq!(next, phase);
            assert_eq!(step, LinkStep::Wait);
        }
    }

    #[test]
    fn test_client_waits_for_handshake() {
        let (phase, step) = client_step(SocketPhase::Connecting, view(TcpState::SynSent, false, false));
        assert_eq!(phase, SocketPhase::Connecting);
        assert_eq!(step, LinkStep::Wait);

        let (phase, step) =
            client_step(SocketPhase::Connecting, view(TcpState::Established, false, true));
        assert_eq!(phase, SocketPhase::Open);
        assert_eq!(step, LinkStep::Connected);
    }

    #[test]
    fn test_client_refused_reports_error() {
        let (phase, step) = client_step(SocketPhase::Connecting, view(TcpState::Closed, false, false));
        assert_eq!(phase, SocketPhase::Finished);
        assert_eq!(step, LinkStep::Error);
    }

    #[test]
    fn test_client_body_then_close() {
        let (_, step) = client_step(SocketPhase::Open, view(TcpState::CloseWait, true, true));
        assert_eq!(step, LinkStep::Receive);

        let (phase, step) = client_step(SocketPhase::Open, view(TcpState::CloseWait, false, false));
        assert_eq!(phase, SocketPhase::Finished);
        assert_eq!(step, LinkStep::Closed);
    }

    #[test]
    fn test_idle_client_reports_nothing() {
        let (phase, step) = client_step(SocketPhase::Idle, view(TcpState::Established, true, true));
        assert_eq!(phase, SocketPhase::Idle);
        assert_eq!(step, LinkStep::Wait);
    }

    #[test]
    fn test_recycle_closed_and_time_wait() {
        assert_eq!(recycle_step(TcpState::Closed, 0, 0, 5_000), Recycle::Relisten);
        assert_eq!(recycle_step(TcpState::TimeWait, 0, 0, 5_000), Recycle::Abort);
    }

    #[test]
    fn test_recycle_aborts_stuck_fin_wait() {
        assert_eq!(recycle_step(TcpState::FinWait2, 1_000, 3_000, 5_000), Recycle::Wait);
        assert_eq!(recycle_step(TcpState::FinWait2, 1_000, 6_000, 5_000), Recycle::Abort);
        assert_eq!(recycle_step(TcpState::LastAck, 1_000, 6_000, 5_000), Recycle::Abort);
    }
}
