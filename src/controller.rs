use crate::{
    builder::Builder,
    event::Events,
    hal::{DmaConfig, Hal, MdcClock},
    interrupt::{InterruptHandler, Shared},
    link::{LinkNegotiation, LinkType},
    multicast::MulticastFilter,
    phy::{Phy, Register},
    rx::{Receiver, RxDescriptorTable},
    stack::{NetworkStack, PacketBuffer},
    statistics::{MediaStatus, Report},
    tx::{Transmitter, TxDescriptorTable},
    Error, EthernetAddress, RX_BUFFER_SIZE, WATCHDOG_PERIOD,
};
use bitflags::bitflags;
use embedded_hal::blocking::delay::DelayMs;
use paste::paste;
use void::Void;

bitflags! {
    /// Interface state as seen by the network stack.
    #[derive(Default)]
    pub struct InterfaceFlags: u8 {
        /// Administratively up.
        const UP = 1 << 0;
        /// Rings allocated and the controller receiving and transmitting.
        const RUNNING = 1 << 1;
        /// Every frame on the wire is accepted.
        const PROMISCUOUS = 1 << 2;
    }
}

impl defmt::Format for InterfaceFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "InterfaceFlags({=u8:#x})", self.bits())
    }
}

/// How speed and duplex are chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Media {
    /// Auto-negotiation, with the watchdog following the link partner.
    Auto,
    /// Auto-negotiation off, PHY and MAC pinned to the given link.
    Fixed(LinkType),
}

/// Control requests from the network stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Request {
    Up,
    Down,
    SetPromiscuous(bool),
    AddMulticast(EthernetAddress, EthernetAddress),
    RemoveMulticast(EthernetAddress, EthernetAddress),
    GetMedia,
    SetMedia(Media),
    ShowStatistics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Response {
    Done,
    Media(MediaStatus),
    Statistics(Report),
}

macro_rules! define_alternate_address_function {
    (
        $($slot:literal),+
    ) => {
        paste! {
            $(
                fn [<set_alternate_address $slot>](&self) {
                    if let Some(address) = self.config.alternate_ethernet_address($slot - 2) {
                        self.hal.set_ethernet_address($slot, &address);
                    }
                }
            )+
        }
    };
}

/// One GMAC interface: the control plane plus the two engines.
///
/// The engines own no thread of their own. They run when polled, so requests,
/// [`Controller::tick`] and the engine polls all happen in whatever context
/// holds the controller.
pub struct Controller<'a, H, D, B, const RXCOUNT: usize, const TXCOUNT: usize> {
    hal: &'a H,
    shared: &'a Shared,
    delay: D,
    config: Builder,
    receiver: Receiver<'a, H, B, RXCOUNT>,
    transmitter: Transmitter<'a, H, B, TXCOUNT>,
    phy: Phy,
    link: LinkNegotiation,
    media: Media,
    multicast: MulticastFilter,
    flags: InterfaceFlags,
    // Ticks until the next link check, `None` while stopped.
    watchdog: Option<u32>,
}

impl<'a, H, D, B, const RXCOUNT: usize, const TXCOUNT: usize> Controller<'a, H, D, B, RXCOUNT, TXCOUNT>
where
    H: Hal,
    D: DelayMs<u32>,
    B: PacketBuffer,
{
    pub(crate) fn new(
        hal: &'a H,
        shared: &'a Shared,
        delay: D,
        rx_descriptors: &'a mut RxDescriptorTable<B, RXCOUNT>,
        tx_descriptors: &'a mut TxDescriptorTable<B, TXCOUNT>,
        config: Builder,
    ) -> Self {
        let mut flags = InterfaceFlags::empty();
        flags.set(InterfaceFlags::PROMISCUOUS, config.has_copy_all_frames());

        Controller {
            hal,
            shared,
            delay,
            config,
            receiver: Receiver::new(hal, shared, rx_descriptors),
            transmitter: Transmitter::new(hal, shared, tx_descriptors),
            phy: Phy::new(config.phy_address(), config.mdio_retries()),
            link: LinkNegotiation::new(),
            media: Media::Auto,
            multicast: MulticastFilter::new(),
            flags,
            watchdog: None,
        }
    }

    /// Brings the interface up. Does nothing if it is already running.
    ///
    /// Only a failure to set up the rings is an error; a missing or
    /// unresponsive PHY leaves the interface running with the default link.
    pub fn init<S>(&mut self, stack: &mut S) -> Result<(), Error>
    where
        S: NetworkStack<Buffer = B>,
    {
        if self.is_running() {
            return Ok(());
        }

        self.configure_controller();
        self.initialize_phy();

        self.hal
            .configure_dma(DmaConfig { receive_buffer_size: RX_BUFFER_SIZE as u16 });
        self.hal.enable_statistics_write(true);

        if let Err(e) = self.start_engines(stack) {
            defmt::warn!("GMAC start failed: {}", e);
            self.stop();
            return Err(e);
        }

        self.flags.insert(InterfaceFlags::RUNNING);
        self.watchdog = Some(1);
        defmt::info!("GMAC running, link {}", self.link.link());
        Ok(())
    }

    /// Stops reception and transmission. Buffers stay attached to the rings
    /// until the next [`Controller::init`].
    pub fn stop(&mut self) {
        self.receiver.stop();
        self.transmitter.stop();
        self.hal.enable_management_port(false);
        self.flags.remove(InterfaceFlags::RUNNING);
        self.watchdog = None;
    }

    /// Wakes the transmit engine after frames were queued.
    pub fn start_output(&self) {
        self.shared.start_output();
    }

    pub fn control<S>(&mut self, stack: &mut S, request: Request) -> Result<Response, Error>
    where
        S: NetworkStack<Buffer = B>,
    {
        match request {
            Request::Up => {
                self.flags.insert(InterfaceFlags::UP);
                self.init(stack)?;
            }
            Request::Down => {
                self.flags.remove(InterfaceFlags::UP);
                if self.is_running() {
                    self.stop();
                }
            }
            Request::SetPromiscuous(enable) => {
                self.flags.set(InterfaceFlags::PROMISCUOUS, enable);
                self.hal.set_copy_all_frames(enable);
            }
            Request::AddMulticast(low, high) => {
                self.hal.enable_multicast_hash(false);
                let changed = self.multicast.add(low, high);
                self.finish_multicast_update(changed)?;
            }
            Request::RemoveMulticast(low, high) => {
                self.hal.enable_multicast_hash(false);
                let changed = self.multicast.remove(low, high);
                self.finish_multicast_update(changed)?;
            }
            Request::GetMedia => return Ok(Response::Media(self.media_status()?)),
            Request::SetMedia(media) => {
                self.apply_media(media, true)?;
                self.media = media;
            }
            Request::ShowStatistics => return Ok(Response::Statistics(self.report())),
        }
        Ok(Response::Done)
    }

    /// Advances the link watchdog; call once per second.
    ///
    /// Returns the link type the MAC was reprogrammed to, if any.
    pub fn tick(&mut self) -> Option<LinkType> {
        let remaining = self.watchdog?;
        if remaining > 1 {
            self.watchdog = Some(remaining - 1);
            return None;
        }

        self.watchdog = Some(WATCHDOG_PERIOD.to_secs());
        self.check_link()
    }

    pub fn media_status(&mut self) -> Result<MediaStatus, Error> {
        let status = self.phy.status(self.hal, &mut self.delay)?;
        Ok(MediaStatus {
            link_up: status.link_detected(),
            auto_negotiation_complete: status.auto_negotiation_complete(),
            link: self.link.link(),
        })
    }

    pub fn report(&mut self) -> Report {
        let report = Report {
            counters: self.shared.counters().snapshot(),
            hardware: self.hal.read_statistics(),
            phy_address: self.phy.address(),
            phy_identifier: self.phy.identifier(),
            media: self.media_status().ok(),
        };
        defmt::info!("{}", report);
        report
    }

    /// Services both engines. Returns `WouldBlock` if neither had a pending
    /// event, so a caller can sleep until the next interrupt.
    pub fn poll<S>(&mut self, stack: &mut S) -> nb::Result<(), Void>
    where
        S: NetworkStack<Buffer = B>,
    {
        let received = self.poll_receive(stack);
        let transmitted = self.poll_transmit(stack);
        match (received, transmitted) {
            (Err(nb::Error::WouldBlock), Err(nb::Error::WouldBlock)) => Err(nb::Error::WouldBlock),
            _ => Ok(()),
        }
    }

    pub fn poll_receive<S>(&mut self, stack: &mut S) -> nb::Result<usize, Void>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.receiver.poll(stack)
    }

    pub fn poll_transmit<S>(&mut self, stack: &mut S) -> nb::Result<(), Void>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.transmitter.poll(stack)
    }

    /// A dispatcher to call from the GMAC interrupt.
    pub fn interrupt_handler(&self) -> InterruptHandler<'a, H> {
        InterruptHandler::new(self.hal, self.shared)
    }

    pub fn engines(&mut self) -> (&mut Receiver<'a, H, B, RXCOUNT>, &mut Transmitter<'a, H, B, TXCOUNT>) {
        (&mut self.receiver, &mut self.transmitter)
    }

    /// True while a receive wakeup is waiting to be serviced.
    pub fn has_receive_work(&self) -> bool {
        self.shared.rx_events().is_pending(Events::RX_INTERRUPT)
    }

    pub fn flags(&self) -> InterfaceFlags {
        self.flags
    }

    pub fn is_running(&self) -> bool {
        self.flags.contains(InterfaceFlags::RUNNING)
    }

    pub fn link(&self) -> LinkType {
        self.link.link()
    }

    pub fn media(&self) -> Media {
        self.media
    }

    pub fn phy(&self) -> &Phy {
        &self.phy
    }

    pub fn multicast(&self) -> &MulticastFilter {
        &self.multicast
    }

    pub fn config(&self) -> &Builder {
        &self.config
    }

    fn configure_controller(&mut self) {
        self.hal
            .set_copy_all_frames(self.flags.contains(InterfaceFlags::PROMISCUOUS));
        self.hal.set_no_broadcast(self.config.has_disable_broadcast());
        self.hal.enable_management_port(true);

        self.hal.set_ethernet_address(1, &self.config.ethernet_address());
        self.set_alternate_address2();
        self.set_alternate_address3();
        self.set_alternate_address4();

        let (bottom, top) = self.multicast.hash();
        self.hal.set_multicast_hash(bottom, top);
        self.hal.enable_multicast_hash(!self.multicast.is_empty());
    }

    define_alternate_address_function!(2, 3, 4);

    fn initialize_phy(&mut self) {
        match MdcClock::for_master_clock(self.config.master_clock()) {
            Some(clock) => {
                self.hal.set_mdc_clock(clock);
                if self.phy.discover(self.hal, &mut self.delay).is_some() {
                    if let Err(e) = self.phy.reset(self.hal, &mut self.delay) {
                        defmt::warn!("PHY reset failed: {}", e);
                    }
                }
            }
            None => {
                defmt::warn!("master clock too fast for the management port");
                self.phy.invalidate();
            }
        }

        self.link.reset();
        self.check_link();

        if let Err(e) = self.apply_media(self.media, false) {
            defmt::warn!("PHY media setup failed: {}", e);
        }
    }

    /// Reprograms the MAC if the link partner advertisement changed.
    fn check_link(&mut self) -> Option<LinkType> {
        if let Media::Fixed(_) = self.media {
            return None;
        }

        let advertisement = self
            .phy
            .read(self.hal, &mut self.delay, Register::Anlpar)
            .unwrap_or(0);
        let link = self.link.update(advertisement)?;
        self.hal.set_link_speed(link);
        defmt::debug!("link advertisement {=u16:#x}, MAC set to {}", advertisement, link);
        Some(link)
    }

    /// Programs the PHY for `media`. The MAC and the watchdog are only
    /// touched once the PHY accepted the change.
    fn apply_media(&mut self, media: Media, restart: bool) -> Result<(), Error> {
        match media {
            Media::Auto => {
                self.phy.modify(self.hal, &mut self.delay, |w| {
                    let w = w.set_enable_auto_negotiation(true);
                    if restart {
                        w.set_auto_negotiation_restart()
                    } else {
                        w
                    }
                })?;
                if restart {
                    self.link.reset();
                    if self.watchdog.is_some() {
                        self.watchdog = Some(1);
                    }
                }
            }
            Media::Fixed(link) => {
                self.phy.modify(self.hal, &mut self.delay, |w| {
                    w.set_enable_auto_negotiation(false)
                        .set_speed_100(link.is_100mbit())
                        .set_full_duplex(link.is_full_duplex())
                })?;
                self.link.force(link);
                self.hal.set_link_speed(link);
                defmt::debug!("link fixed to {}", link);
            }
        }
        Ok(())
    }

    fn start_engines<S>(&mut self, stack: &mut S) -> Result<(), Error>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.receiver.initialize(stack, self.config.rx_buffers())?;
        self.transmitter.initialize(stack, self.config.tx_buffers())
    }

    fn finish_multicast_update(&mut self, changed: Result<bool, Error>) -> Result<(), Error> {
        if let Ok(true) = changed {
            let (bottom, top) = self.multicast.hash();
            self.hal.set_multicast_hash(bottom, top);
        }
        self.hal.enable_multicast_hash(true);
        changed.map(|_| ())
    }
}
