// TCP/IP Stack: smoltcp direkt auf dem WiFi-Device von esp-radio
//
// Setzt den Network-Trait aus esp-core um. Es gibt keine Callbacks: bei jedem
// next_event() wird der Socket-Zustand auf SocketView abgebildet, die
// Entscheidung über das nächste Event trifft esp_core::link.

use defmt::{debug, info, warn};
use esp_core::link::{client_step, recycle_step, server_step};
use esp_core::{
    Ipv4Addr, LinkStep, NetError, NetEvent, Network, Recycle, SocketPhase, SocketView, TcpState,
};
use esp_radio::wifi::WifiDevice;
use heapless::Vec;
use smoltcp::iface::{Config, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::socket::{dhcpv4, tcp};
use smoltcp::time::Instant;
use smoltcp::wire::{DhcpOption, EthernetAddress, HardwareAddress, IpAddress, IpCidr, Ipv4Address};

use crate::config::{
    DHCP_HOSTNAME, FETCH_RX_BUFFER_SIZE, FETCH_TX_BUFFER_SIZE, HTTP_SOCKET_COUNT,
    SERVER_LINGER_MS, SOCKET_COUNT, TCP_RX_BUFFER_SIZE, TCP_TX_BUFFER_SIZE,
};

/// DHCP Option 12 (Hostname)
static DHCP_OPTIONS: [DhcpOption<'static>; 1] = [DhcpOption {
    kind: 12,
    data: DHCP_HOSTNAME,
}];

/// Erster lokaler Port für ausgehende Verbindungen (dynamischer Bereich)
const EPHEMERAL_PORT_START: u16 = 49152;

/// Statischer Speicher für Socket-Tabelle und TCP-Puffer
///
/// Wird einmal in einer `ConstStaticCell` angelegt, damit die Puffer
/// nicht über den Stack kopiert werden.
pub struct NetResources {
    sockets: [SocketStorage<'static>; SOCKET_COUNT],
    server_rx: [[u8; TCP_RX_BUFFER_SIZE]; HTTP_SOCKET_COUNT],
    server_tx: [[u8; TCP_TX_BUFFER_SIZE]; HTTP_SOCKET_COUNT],
    client_rx: [u8; FETCH_RX_BUFFER_SIZE],
    client_tx: [u8; FETCH_TX_BUFFER_SIZE],
}

impl NetResources {
    pub const fn new() -> Self {
        Self {
            sockets: [SocketStorage::EMPTY; SOCKET_COUNT],
            server_rx: [[0; TCP_RX_BUFFER_SIZE]; HTTP_SOCKET_COUNT],
            server_tx: [[0; TCP_TX_BUFFER_SIZE]; HTTP_SOCKET_COUNT],
            client_rx: [0; FETCH_RX_BUFFER_SIZE],
            client_tx: [0; FETCH_TX_BUFFER_SIZE],
        }
    }
}

impl Default for NetResources {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    handle: SocketHandle,
    phase: SocketPhase,
    /// Zeitpunkt der Freigabe durch den Core
    released_ms: u64,
}

impl Slot {
    fn new(handle: SocketHandle) -> Self {
        Self {
            handle,
            phase: SocketPhase::Idle,
            released_ms: 0,
        }
    }
}

/// smoltcp-basierter Network-Stack
///
/// `HTTP_SOCKET_COUNT` Server-Sockets lauschen parallel auf dem HTTP-Port,
/// ein einzelner Client-Socket dient dem Fetch. Dazu kommt der DHCP-Socket.
pub struct SmolNetwork<'d> {
    iface: Interface,
    device: WifiDevice<'d>,
    sockets: SocketSet<'static>,
    dhcp: SocketHandle,
    servers: Vec<Slot, HTTP_SOCKET_COUNT>,
    client: Slot,
    listen_port: Option<u16>,
    local_port: u16,
    now_ms: u64,
    address: Option<Ipv4Address>,
}

impl<'d> SmolNetwork<'d> {
    pub fn new(
        mut device: WifiDevice<'d>,
        resources: &'static mut NetResources,
        seed: u64,
        now_ms: u64,
    ) -> Self {
        let NetResources {
            sockets,
            server_rx,
            server_tx,
            client_rx,
            client_tx,
        } = resources;

        let mut config = Config::new(HardwareAddress::Ethernet(EthernetAddress::from_bytes(
            &device.mac_address(),
        )));
        config.random_seed = seed;
        let iface = Interface::new(config, &mut device, timestamp(now_ms));

        let mut set = SocketSet::new(&mut sockets[..]);

        let mut dhcp_socket = dhcpv4::Socket::new();
        dhcp_socket.set_outgoing_options(&DHCP_OPTIONS);
        let dhcp = set.add(dhcp_socket);

        let mut servers = Vec::new();
        for (rx, tx) in server_rx.iter_mut().zip(server_tx.iter_mut()) {
            let socket = tcp::Socket::new(
                tcp::SocketBuffer::new(&mut rx[..]),
                tcp::SocketBuffer::new(&mut tx[..]),
            );
            let slot = Slot::new(set.add(socket));
            // Kapazität entspricht genau der Anzahl Puffer
            let _ = servers.push(slot);
        }

        let client = tcp::Socket::new(
            tcp::SocketBuffer::new(&mut client_rx[..]),
            tcp::SocketBuffer::new(&mut client_tx[..]),
        );
        let client = Slot::new(set.add(client));

        Self {
            iface,
            device,
            sockets: set,
            dhcp,
            servers,
            client,
            listen_port: None,
            local_port: EPHEMERAL_PORT_START + (seed % 1024) as u16,
            now_ms,
            address: None,
        }
    }

    /// Per DHCP bezogene Adresse, `None` solange keine Lease besteht
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.address.map(|addr| addr.octets())
    }

    fn poll_dhcp(&mut self) {
        let lease = match self.sockets.get_mut::<dhcpv4::Socket>(self.dhcp).poll() {
            None => return,
            Some(dhcpv4::Event::Configured(config)) => Some((config.address, config.router)),
            Some(dhcpv4::Event::Deconfigured) => None,
        };

        match lease {
            Some((cidr, router)) => {
                self.iface.update_ip_addrs(|addrs| {
                    addrs.clear();
                    let _ = addrs.push(IpCidr::Ipv4(cidr));
                });
                match router {
                    Some(router) => {
                        let _ = self.iface.routes_mut().add_default_ipv4_route(router);
                    }
                    None => {
                        self.iface.routes_mut().remove_default_ipv4_route();
                    }
                }

                let [a, b, c, d] = cidr.address().octets();
                info!("NET: DHCP lease {}.{}.{}.{}/{}", a, b, c, d, cidr.prefix_len());
                self.address = Some(cidr.address());
            }
            None => {
                warn!("NET: DHCP lease lost");
                self.iface.update_ip_addrs(|addrs| addrs.clear());
                self.iface.routes_mut().remove_default_ipv4_route();
                self.address = None;
            }
        }
    }

    /// Setzt freigegebene Server-Sockets wieder auf Listen
    fn recycle_servers(&mut self) {
        let Some(port) = self.listen_port else {
            return;
        };

        let now_ms = self.now_ms;
        for slot in self
            .servers
            .iter_mut()
            .filter(|s| s.phase == SocketPhase::Released)
        {
            let socket = self.sockets.get_mut::<tcp::Socket>(slot.handle);
            let state = tcp_state(socket.state());
            match recycle_step(state, slot.released_ms, now_ms, SERVER_LINGER_MS) {
                Recycle::Wait => continue,
                Recycle::Abort => {
                    if state != TcpState::TimeWait {
                        debug!("NET: Peer never closed ({}), aborting", state);
                    }
                    socket.abort();
                }
                Recycle::Relisten => {}
            }

            match socket.listen(port) {
                Ok(()) => slot.phase = SocketPhase::Idle,
                Err(e) => warn!("NET: Re-listen failed: {}", defmt::Debug2Format(&e)),
            }
        }
    }

    fn next_local_port(&mut self) -> u16 {
        let port = self.local_port;
        self.local_port = match self.local_port.checked_add(1) {
            Some(next) => next,
            None => EPHEMERAL_PORT_START,
        };
        port
    }

    fn slot_mut(&mut self, conn: SocketHandle) -> Option<&mut Slot> {
        if self.client.handle == conn {
            return Some(&mut self.client);
        }
        self.servers.iter_mut().find(|s| s.handle == conn)
    }

    /// Gibt den Handle frei; Server-Sockets werden später recycelt
    fn release(&mut self, conn: SocketHandle) {
        let is_client = self.client.handle == conn;
        let now_ms = self.now_ms;
        if let Some(slot) = self.slot_mut(conn) {
            slot.released_ms = now_ms;
            slot.phase = if is_client {
                SocketPhase::Idle
            } else {
                SocketPhase::Released
            };
        }
    }
}

impl Network for SmolNetwork<'_> {
    type Conn = SocketHandle;

    fn listen(&mut self, port: u16) -> Result<(), NetError> {
        for slot in self.servers.iter_mut() {
            let socket = self.sockets.get_mut::<tcp::Socket>(slot.handle);
            socket.listen(port).map_err(|e| match e {
                tcp::ListenError::InvalidState => NetError::InvalidState,
                tcp::ListenError::Unaddressable => NetError::Unaddressable,
            })?;
            slot.phase = SocketPhase::Idle;
        }
        self.listen_port = Some(port);
        Ok(())
    }

    fn poll(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.iface
            .poll(timestamp(now_ms), &mut self.device, &mut self.sockets);
        self.poll_dhcp();
        self.recycle_servers();
    }

    fn next_event(&mut self, buf: &mut [u8]) -> Option<NetEvent<SocketHandle>> {
        for slot in self.servers.iter_mut() {
            let socket = self.sockets.get_mut::<tcp::Socket>(slot.handle);
            let (phase, step) = server_step(slot.phase, socket_view(socket));
            slot.phase = phase;
            if let Some(event) = link_event(slot, socket, step, buf) {
                return Some(event);
            }
        }

        let slot = &mut self.client;
        let socket = self.sockets.get_mut::<tcp::Socket>(slot.handle);
        let (phase, step) = client_step(slot.phase, socket_view(socket));
        slot.phase = phase;
        link_event(slot, socket, step, buf)
    }

    fn connect(&mut self, remote: Ipv4Addr, port: u16) -> Result<SocketHandle, NetError> {
        if self.client.phase != SocketPhase::Idle {
            return Err(NetError::Exhausted);
        }
        if self.address.is_none() {
            return Err(NetError::Unaddressable);
        }

        let local_port = self.next_local_port();
        let socket = self.sockets.get_mut::<tcp::Socket>(self.client.handle);
        if socket.is_open() {
            // Rest der vorherigen Sitzung
            socket.abort();
        }

        let remote = IpAddress::Ipv4(Ipv4Address::new(remote[0], remote[1], remote[2], remote[3]));
        socket
            .connect(self.iface.context(), (remote, port), local_port)
            .map_err(|e| match e {
                tcp::ConnectError::InvalidState => NetError::InvalidState,
                tcp::ConnectError::Unaddressable => NetError::Unaddressable,
            })?;

        debug!("NET: Connecting from local port {}", local_port);
        self.client.phase = SocketPhase::Connecting;
        Ok(self.client.handle)
    }

    fn send(&mut self, conn: SocketHandle, data: &[u8]) -> Result<usize, NetError> {
        self.sockets
            .get_mut::<tcp::Socket>(conn)
            .send_slice(data)
            .map_err(|_| NetError::InvalidState)
    }

    fn close(&mut self, conn: SocketHandle) {
        self.sockets.get_mut::<tcp::Socket>(conn).close();
        self.release(conn);
    }

    fn abort(&mut self, conn: SocketHandle) {
        self.sockets.get_mut::<tcp::Socket>(conn).abort();
        self.release(conn);
    }
}

/// Führt einen Schritt aus und erzeugt das passende Event
fn link_event(
    slot: &mut Slot,
    socket: &mut tcp::Socket<'_>,
    step: LinkStep,
    buf: &mut [u8],
) -> Option<NetEvent<SocketHandle>> {
    match step {
        LinkStep::Wait => None,
        LinkStep::Accepted => Some(NetEvent::Accepted(slot.handle)),
        LinkStep::Connected => Some(NetEvent::Connected(slot.handle)),
        LinkStep::Receive => match socket.recv_slice(buf) {
            Ok(0) => None,
            Ok(len) => Some(NetEvent::Received(slot.handle, len)),
            Err(_) => {
                slot.phase = SocketPhase::Finished;
                Some(NetEvent::Error(slot.handle))
            }
        },
        LinkStep::Closed => Some(NetEvent::Closed(slot.handle)),
        LinkStep::Error => Some(NetEvent::Error(slot.handle)),
    }
}

fn socket_view(socket: &tcp::Socket<'_>) -> SocketView {
    SocketView {
        state: tcp_state(socket.state()),
        can_recv: socket.can_recv(),
        may_recv: socket.may_recv(),
    }
}

fn tcp_state(state: tcp::State) -> TcpState {
    match state {
        tcp::State::Closed => TcpState::Closed,
        tcp::State::Listen => TcpState::Listen,
        tcp::State::SynSent => TcpState::SynSent,
        tcp::State::SynReceived => TcpState::SynReceived,
        tcp::State::Established => TcpState::Established,
        tcp::State::FinWait1 => TcpState::FinWait1,
        tcp::State::FinWait2 => TcpState::FinWait2,
        tcp::State::CloseWait => TcpState::CloseWait,
        tcp::State::Closing => TcpState::Closing,
        tcp::State::LastAck => TcpState::LastAck,
        tcp::State::TimeWait => TcpState::TimeWait,
    }
}

fn timestamp(now_ms: u64) -> Instant {
    Instant::from_millis(now_ms as i64)
}
