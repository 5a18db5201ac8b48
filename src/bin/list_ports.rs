use serialport::{SerialPortType, available_ports};
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    info!("Listing serial ports...\n");

    match available_ports() {
        Ok(ports) => {
            for (count, port) in ports.iter().enumerate() {
                info!("Port #{}: {}", count + 1, port.port_name);
                match &port.port_type {
                    SerialPortType::UsbPort(usb) => {
                        info!("  Type: USB, VID: {:#06x}, PID: {:#06x}", usb.vid, usb.pid);
                        if let Some(manufacturer) = &usb.manufacturer {
                            info!("  Manufacturer: {}", manufacturer);
                        } else {
                            info!("  Manufacturer: <Not available>");
                        }
                        if let Some(product) = &usb.product {
                            info!("  Product: {}", product);
                        } else {
                            info!("  Product: <Not available>");
                        }
                        if let Some(serial) = &usb.serial_number {
                            info!("  Serial: {}", serial);
                        }
                    }
                    SerialPortType::PciPort => info!("  Type: PCI"),
                    SerialPortType::BluetoothPort => info!("  Type: Bluetooth"),
                    SerialPortType::Unknown => info!("  Type: <Unknown>"),
                }
                info!("---");
            }
            if ports.is_empty() {
                info!("No serial ports found.");
            }
        }
        Err(e) => {
            error!("Error listing serial ports: {}", e);
            std::process::exit(1);
        }
    }
}
