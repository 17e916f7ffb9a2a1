// CSV export of offers and newline-delimited export of ranked emails.

use std::io::{self, Write};

use crate::models::offer::JobOffer;

pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Entreprise",
    "Titre",
    "URL",
    "Email",
    "Ville",
    "Domaine",
    "Type",
    "Rémunération",
    "Date",
];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Header plus one row per offer, in the given order.
pub fn write_csv<'a, W: Write>(
    mut w: W,
    offers: impl IntoIterator<Item = &'a JobOffer>,
) -> io::Result<usize> {
    write_row(&mut w, &CSV_HEADER)?;
    let mut rows = 0;
    for offer in offers {
        let id = offer.id.to_string();
        write_row(
            &mut w,
            &[
                id.as_str(),
                offer.entreprise.as_str(),
                offer.titre.as_str(),
                offer.url.as_str(),
                offer.email.as_deref().unwrap_or_default(),
                offer.ville.as_str(),
                offer.domaine.as_str(),
                offer.type_contrat.as_str(),
                offer.remuneration.as_deref().unwrap_or_default(),
                offer.date_publication.as_str(),
            ],
        )?;
        rows += 1;
    }
    w.flush()?;
    Ok(rows)
}

pub fn write_emails<'a, W: Write>(
    mut w: W,
    emails: impl IntoIterator<Item = &'a str>,
) -> io::Result<()> {
    for email in emails {
        writeln!(w, "{email}")?;
    }
    w.flush()
}
