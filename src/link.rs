use crate::phy::Anlpar;

/// Speed and duplex the MAC is programmed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum LinkType {
    HalfDuplex10,
    FullDuplex10,
    HalfDuplex100,
    FullDuplex100,
}

impl LinkType {
    pub fn is_full_duplex(&self) -> bool {
        matches!(self, LinkType::FullDuplex10 | LinkType::FullDuplex100)
    }

    pub fn is_100mbit(&self) -> bool {
        matches!(self, LinkType::HalfDuplex100 | LinkType::FullDuplex100)
    }

    /// Picks the best mode both ends support from the link partner's
    /// advertisement, preferring full duplex over speed.
    pub fn from_advertisement(advertisement: Anlpar) -> Self {
        if advertisement.full_duplex_100base_tx_capable() {
            LinkType::FullDuplex100
        } else if advertisement.full_duplex_10base_t_capable() {
            LinkType::FullDuplex10
        } else if advertisement.half_duplex_100base_tx_capable() {
            LinkType::HalfDuplex100
        } else if advertisement.half_duplex_10base_t_capable() {
            LinkType::HalfDuplex10
        } else {
            LinkType::FullDuplex100
        }
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::FullDuplex100
    }
}

/// Watchdog driven link speed selection.
///
/// Remembers the last link partner advertisement so that the MAC is only
/// reprogrammed when the advertisement actually changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct LinkNegotiation {
    advertisement: Option<u16>,
    link: LinkType,
}

impl LinkNegotiation {
    pub const fn new() -> Self {
        LinkNegotiation {
            advertisement: None,
            link: LinkType::FullDuplex100,
        }
    }

    /// Feeds the advertisement read on this tick. Returns the link type to
    /// program if it has to be (re)programmed.
    pub fn update(&mut self, advertisement: u16) -> Option<LinkType> {
        if self.advertisement == Some(advertisement) {
            return None;
        }

        self.advertisement = Some(advertisement);
        self.link = LinkType::from_advertisement(Anlpar::new(advertisement));
        Some(self.link)
    }

    /// Forgets the cached advertisement so the next update reprograms the MAC.
    pub fn reset(&mut self) {
        self.advertisement = None;
    }

    /// Pins the link to `link` until the next [`LinkNegotiation::reset`].
    pub(crate) fn force(&mut self, link: LinkType) {
        self.link = link;
    }

    pub fn link(&self) -> LinkType {
        self.link
    }

    pub fn advertisement(&self) -> Option<u16> {
        self.advertisement
    }
}
