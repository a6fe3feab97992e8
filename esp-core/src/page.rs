//! Statusseite des HTTP-Servers
//!
//! Eine feste HTML-Seite, in die der Zustand beider Taster und der letzte
//! Messwert eingesetzt werden. Gleicher Zustand ergibt byte-identische Ausgabe.

use core::fmt::Write;

use heapless::String;

use crate::types::{ButtonId, ButtonStatus, SensorReading};

const HEADER: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n";

const HEAD: &str = "<!DOCTYPE html>\
<html>\
<head>\
<meta charset=\"UTF-8\">\
<title>Steuerung LED und Taster</title>\
</head>\
<body>\
<h1>Steuerung LED und Taster</h1>\
<p><a href=\"/led/on\">LED einschalten</a></p>\
<p><a href=\"/led/off\">LED ausschalten</a></p>\
<p><a href=\"/update\">Messwerte aktualisieren</a></p>\
<h2>Zustand der Taster:</h2>";

const TAIL: &str = "</body></html>\r\n";

/// Rendert Header und HTML in `out` (vorheriger Inhalt wird verworfen)
pub fn render<const N: usize>(
    out: &mut String<N>,
    buttons: &[ButtonStatus; 2],
    reading: SensorReading,
) -> Result<(), core::fmt::Error> {
    out.clear();
    out.push_str(HEADER).map_err(|_| core::fmt::Error)?;
    out.push_str(HEAD).map_err(|_| core::fmt::Error)?;

    for id in ButtonId::ALL {
        write!(
            out,
            "<p>Taster {}: {}</p>",
            id.number(),
            buttons[id.index()].describe()
        )?;
    }

    write!(
        out,
        "<h2>Sensor:</h2>\
         <p>Temperatur: {:.2} &deg;C</p>\
         <p>Luftfeuchtigkeit: {:.2} %</p>",
        reading.temperature, reading.humidity
    )?;

    out.push_str(TAIL).map_err(|_| core::fmt::Error)
}
