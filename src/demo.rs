use crate::domain::record::CustomerRecord;
use crate::normalize::normalize;

const DEMO_ROWS: [[&str; 8]; 5] = [
    [
        "ODP-BDG-001",
        "Budi Santoso",
        "Jl. Merdeka No.1, Bandung",
        "081234567890",
        "Nandi",
        "Visited",
        "Sudah follow up, tertarik paket 100Mbps",
        "Diterima",
    ],
    [
        "ODP-BDG-002",
        "Siti Nurhaliza",
        "Jl. Sudirman No.2, Bandung",
        "082345678901",
        "Andi",
        "Pending",
        "Menunggu konfirmasi dari keluarga",
        "Diterima",
    ],
    [
        "ODP-BDG-003",
        "Ahmad Dahlan",
        "Jl. Gatot Subroto No.3",
        "083456789012",
        "Yandi",
        "Not Visited",
        "Belum dihubungi, nomor tidak aktif",
        "Pending",
    ],
    [
        "ODP-BDG-004",
        "Rina Marlina",
        "Jl. Asia Afrika No.4",
        "084567890123",
        "April",
        "Scheduled",
        "Janji ketemu hari Rabu jam 14:00",
        "Diterima",
    ],
    [
        "ODP-BDG-005",
        "Dedi Kurniawan",
        "Jl. Cihampelas No.5",
        "085678901234",
        "Octa",
        "Visited",
        "Sudah survey lokasi, oke untuk instalasi",
        "Diterima",
    ],
];

pub const DEMO_WARNING: &str = "showing demo data; the spreadsheet could not be loaded";

/// Fixed dataset shown when the sheet cannot be read.
pub fn demo_records() -> Vec<CustomerRecord> {
    let rows: Vec<Vec<String>> = DEMO_ROWS
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    normalize(&rows)
}
