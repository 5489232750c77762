use core::fmt::Debug;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::spi::SpiDevice;

/// Link to the base controller: a full-duplex byte exchange, the ack line it raises while it
/// has consumed a request or has a reply ready, and the enable line that powers it.
pub trait BaseBus {
    type Error: Debug;

    /// Clocks `buf` out and replaces it with the bytes clocked in. It should be blocking.
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Level of the ack line. It should be non-blocking.
    fn is_ack_high(&mut self) -> Result<bool, Self::Error>;

    fn set_enable(&mut self, enabled: bool) -> Result<(), Self::Error>;
}

impl<B: BaseBus + ?Sized> BaseBus for &mut B {
    type Error = B::Error;

    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).transfer(buf)
    }

    fn is_ack_high(&mut self) -> Result<bool, Self::Error> {
        (**self).is_ack_high()
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        (**self).set_enable(enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiBaseError<S, A, E> {
    Spi(S),
    Ack(A),
    Enable(E),
}

/// [`BaseBus`] over an embedded-hal SPI device and two GPIOs.
/// The SPI device owns the chip select.
#[derive(Debug)]
pub struct SpiBase<SPI, ACK, EN> {
    spi: SPI,
    ack: ACK,
    enable: EN,
}

impl<SPI, ACK, EN> SpiBase<SPI, ACK, EN>
where
    SPI: SpiDevice,
    ACK: InputPin,
    EN: OutputPin,
{
    pub fn new(spi: SPI, ack: ACK, enable: EN) -> Self {
        Self { spi, ack, enable }
    }

    pub fn release(self) -> (SPI, ACK, EN) {
        (self.spi, self.ack, self.enable)
    }
}

impl<SPI, ACK, EN> BaseBus for SpiBase<SPI, ACK, EN>
where
    SPI: SpiDevice,
    ACK: InputPin,
    EN: OutputPin,
{
    type Error = SpiBaseError<SPI::Error, ACK::Error, EN::Error>;

    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transfer_in_place(buf).map_err(SpiBaseError::Spi)
    }

    fn is_ack_high(&mut self) -> Result<bool, Self::Error> {
        self.ack.is_high().map_err(SpiBaseError::Ack)
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.enable
            .set_state(PinState::from(enabled))
            .map_err(SpiBaseError::Enable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::spi::{ErrorType as SpiErrorType, Operation};

    /// Answers every byte with its complement.
    struct Inverter;

    impl SpiErrorType for Inverter {
        type Error = Infallible;
    }

    impl SpiDevice for Inverter {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
            for op in operations {
                if let Operation::TransferInPlace(buf) = op {
                    buf.iter_mut().for_each(|b| *b = !*b);
                }
            }
            Ok(())
        }
    }

    struct Line(bool);

    impl PinErrorType for Line {
        type Error = Infallible;
    }

    impl InputPin for Line {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    impl OutputPin for Line {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }
    }

    #[test]
    fn spi_base_drives_the_lines() {
        let mut base = SpiBase::new(Inverter, Line(true), Line(false));

        let mut buf = [0x00, 0xFF, 0x0F];
        base.transfer(&mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0x00, 0xF0]);
        assert_eq!(base.is_ack_high(), Ok(true));

        base.set_enable(true).unwrap();
        let (_, _, enable) = base.release();
        assert!(enable.0);
    }
}
