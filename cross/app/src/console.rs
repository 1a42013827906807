//! A display that prints its frames to the defmt log.
use core::convert::Infallible;

use defmt::info;
use smart_clock::face::{Color, Display, Font};

pub struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    type Error = Infallible;

    fn fill(&mut self, color: Color) -> Result<(), Infallible> {
        info!("display: fill {=u16:#x}", *color);
        Ok(())
    }

    fn print(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        font: Font,
        fg: Color,
        bg: Color,
    ) -> Result<(), Infallible> {
        info!(
            "display: ({}, {}) {:?} {} fg={=u16:#x} bg={=u16:#x}",
            x, y, text, font, *fg, *bg
        );
        Ok(())
    }

    fn show(&mut self) -> Result<(), Infallible> {
        info!("display: show");
        Ok(())
    }
}
