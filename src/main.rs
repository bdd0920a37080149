#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
extern crate rlibc;

#[cfg(target_os = "none")]
mod boot {
    use bootloader_api::{entry_point, BootInfo};
    use core::panic::PanicInfo;
    use pulse::config::KernelConfig;
    use pulse::interrupts::trap;
    use pulse::kernel::{global::KERNEL, init, logger};

    const CONFIG: KernelConfig = KernelConfig::DEFAULT;

    entry_point!(kernel_main);

    fn kernel_main(_boot_info: &'static mut BootInfo) -> ! {
        x86_64::instructions::interrupts::disable();

        if init::init_kernel(CONFIG).is_err() {
            init::halt();
        }

        let frame = KERNEL.lock().start();
        // Interrupts come on with the first process's flags.
        unsafe { trap::resume(frame.as_ptr()) }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        x86_64::instructions::interrupts::disable();
        logger::emergency(format_args!("{} | {:?}", info.message(), info.location()));

        if CONFIG.break_on_panic {
            x86_64::instructions::interrupts::int3();
        }
        init::halt()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("the kernel binary only runs on a bare-metal x86_64 target");
}
