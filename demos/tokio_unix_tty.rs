use elm327_can::tokio::CanSocket;
use elm327_can::ControlMode;
use tokio_serial::SerialPortBuilderExt;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let arg = std::env::args().nth(1);

    let Some(filename) = arg else {
        eprintln!("usage: tokio_unix_tty <TTY path>");
        std::process::exit(1);
    };

    let mut port = tokio_serial::new(filename, 115_200).open_native_async()?;

    #[cfg(unix)]
    port.set_exclusive(false)
        .expect("Unable to set serial port exclusive to false");

    let mut can = CanSocket::new(port);
    can.open(500_000, ControlMode::Normal)
        .expect("bitrate rejected");

    loop {
        match can.recv().await {
            Ok(event) => println!("{:?}", event),
            Err(e) => eprintln!("{:?}", e),
        }
    }
}
