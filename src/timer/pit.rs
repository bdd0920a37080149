use x86_64::instructions::port::Port;

const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;
const PIT_FREQ: u32 = 1_193_182; // Hz base

/// Programs channel 0 as a rate generator firing `hz` times per second.
pub fn init_pit(hz: u32) -> Result<(), &'static str> {
    if hz == 0 || PIT_FREQ / hz > u16::MAX as u32 {
        return Err("PIT frequency out of range");
    }
    let divisor = (PIT_FREQ / hz) as u16;

    unsafe {
        let mut command = Port::<u8>::new(PIT_COMMAND);
        let mut channel0 = Port::<u8>::new(PIT_CHANNEL0);

        // Command: channel 0, low/high byte access, mode 2 (rate generator), binary mode
        command.write(0x34);
        channel0.write((divisor & 0xFF) as u8); // low byte
        channel0.write((divisor >> 8) as u8); // high byte
    }
    Ok(())
}
