use elm327_can::sync::CanSocket;
use elm327_can::ControlMode;
use serialport::TTYPort;

fn main() -> std::io::Result<()> {
    let arg = std::env::args().nth(1);

    let Some(filename) = arg else {
        eprintln!("usage: sync_unix_tty <TTY path>");
        std::process::exit(1);
    };

    let port = serialport::TTYPort::open(&serialport::new(filename, 115200))?;

    let mut can = CanSocket::<TTYPort>::new(port);
    can.open(500_000, ControlMode::Normal)
        .expect("bitrate rejected");

    loop {
        match can.poll()? {
            Some(event) => println!("{:?}", event),
            None => continue,
        }
    }
}
