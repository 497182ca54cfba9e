//! AS-REP roasting: crack strings in the formats parsed by hashcat and
//! john, and the append-only file they are saved to.

use crate::error::{Error, Result};
use kerberos_asn1::AsRep;
use kerberos_constants::etypes;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

const RC4_CHECKSUM_SIZE: usize = 16;
const AES_CHECKSUM_SIZE: usize = 12;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum CrackFormat {
    #[default]
    Hashcat,
    John,
}

impl FromStr for CrackFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashcat" => Ok(Self::Hashcat),
            "john" => Ok(Self::John),
            _ => Err(format!("Unknown crack format '{}'", s)),
        }
    }
}

impl fmt::Display for CrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashcat => write!(f, "hashcat"),
            Self::John => write!(f, "john"),
        }
    }
}

/// Name of the client principal of an AS-REP, components joined by `/`
pub fn as_rep_username(as_rep: &AsRep) -> String {
    as_rep.cname.name_string.join("/")
}

pub fn as_rep_to_crack_string(
    as_rep: &AsRep,
    crack_format: CrackFormat,
) -> Result<String> {
    let username = as_rep_username(as_rep);
    let realm = &as_rep.crealm;
    let etype = as_rep.enc_part.etype;

    let (checksum, edata) =
        divide_checksum_and_ciphertext(etype, &as_rep.enc_part.cipher)?;
    let checksum = hex::encode(checksum);
    let edata = hex::encode(edata);

    let crack_string = match crack_format {
        CrackFormat::Hashcat => match etype {
            etypes::AES128_CTS_HMAC_SHA1_96
            | etypes::AES256_CTS_HMAC_SHA1_96 => format!(
                "$krb5asrep${}${}${}${}${}",
                etype, username, realm, checksum, edata
            ),
            _ => format!(
                "$krb5asrep${}${}@{}:{}${}",
                etype, username, realm, checksum, edata
            ),
        },
        CrackFormat::John => format!(
            "$krb5asrep${}@{}:{}${}",
            username, realm, checksum, edata
        ),
    };

    Ok(crack_string)
}

// RC4 places the HMAC before the ciphertext, AES appends it.
fn divide_checksum_and_ciphertext(
    etype: i32,
    cipher: &[u8],
) -> Result<(&[u8], &[u8])> {
    match etype {
        etypes::RC4_HMAC => {
            if cipher.len() <= RC4_CHECKSUM_SIZE {
                return Err(too_short(etype, cipher.len()));
            }
            Ok((&cipher[..RC4_CHECKSUM_SIZE], &cipher[RC4_CHECKSUM_SIZE..]))
        }
        etypes::AES128_CTS_HMAC_SHA1_96 | etypes::AES256_CTS_HMAC_SHA1_96 => {
            if cipher.len() <= AES_CHECKSUM_SIZE {
                return Err(too_short(etype, cipher.len()));
            }
            let index = cipher.len() - AES_CHECKSUM_SIZE;
            Ok((&cipher[index..], &cipher[..index]))
        }
        _ => Err(Error::Protocol(format!(
            "Unsupported etype {} for AS-REP hash",
            etype
        ))),
    }
}

fn too_short(etype: i32, len: usize) -> Error {
    Error::Protocol(format!(
        "AS-REP cipher too short for etype {} ({} bytes)",
        etype, len
    ))
}

/// Append-only file of captured hashes. Lines written from several
/// threads never interleave.
#[derive(Debug)]
pub struct HashSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl HashSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::Io(
                    format!("Unable to open hash file '{}'", path.display()),
                    err,
                )
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, line: &str) -> Result<()> {
        let record = format!("{}\n", line);
        let mut file = self.file.lock().map_err(|_| {
            Error::Io(
                format!("Hash file '{}' lock poisoned", self.path.display()),
                std::io::Error::new(std::io::ErrorKind::Other, "poisoned lock"),
            )
        })?;

        file.write_all(record.as_bytes()).map_err(|err| {
            Error::Io(
                format!("Unable to write to hash file '{}'", self.path.display()),
                err,
            )
        })
    }
}
