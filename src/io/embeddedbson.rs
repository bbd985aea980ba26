//! module to do bson io for the refined embedding
//!
//!  Data are formatted in bson Documents, each value has a key.
//!
//!  The encoding is done in 2 parts:
//! 1. A header structure with key "header". The structure is described below see struct [Header](EmbeddedBsonHeader)
//! - a version index
//! - base type name, here f64, encoded as a String. key is type_name.
//! - symetric flag (always true for a refined embedding)
//! - dimension of vectors
//! - number of vectors
//!
//! 2. The embedded vectors, one document per node. The vector of node i has key "i,0".
//!

// Note : a Bson document must not be larger than 16Mb!
// So we need to have many Documents in the file dumped

use anyhow::anyhow;

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bson::{bson, Bson, Document};
use serde::{Deserialize, Serialize};

use ndarray::{Array2, ArrayView1};
use num_traits::cast::FromPrimitive;

use crate::embedding::Embedded;

/// tag of the (unique) representation of a node in a symetric embedding
const TAG_SYM: u8 = 0;

/// This structure defines the header of the bson document
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddedBsonHeader {
    /// version of dump format
    pub version: i64,
    /// true if embedding is symetric
    pub symetric: bool,
    /// encodes type of vectors used in the embedding.
    pub type_name: String,
    /// dimension of the embedding (length of vectors)
    pub dimension: i64,
    /// number of vectors.
    pub nbdata: i64,
} // end of EmbeddedBsonHeader

fn node_key(i: usize) -> String {
    let mut key = i.to_string();
    key.push(',');
    key.push_str(&TAG_SYM.to_string());
    key
}

/// dump an embedding in bson format in file fname.
/// The dump consists in a header document. Then each node is dumped in its document (a bson document must less than 16Mb)
pub fn bson_dump(embedded: &Embedded, fname: &str) -> Result<(), anyhow::Error> {
    //
    log::info!("entering bson_dump");
    //
    let path = Path::new(fname);
    let fileres = OpenOptions::new().write(true).create(true).truncate(true).open(path);
    let file = if fileres.is_ok() {
        fileres.unwrap()
    } else {
        return Err(anyhow!("could not open file : {}", path.display()));
    };
    let mut bufwriter = BufWriter::new(file);
    let mut doc = Document::new();
    // dump header part
    let dim: i64 = FromPrimitive::from_usize(embedded.get_dimension()).ok_or(anyhow!("dimension overflow"))?;
    let nbdata: i64 = FromPrimitive::from_usize(embedded.get_nb_nodes()).ok_or(anyhow!("nb nodes overflow"))?;
    let bson_header = bson!({
        "version": 1_i64,
        "symetric": true,
        "type_name": std::any::type_name::<f64>(),
        "dimension": dim,
        "nbdata": nbdata
        }
    );
    doc.insert("header", bson_header);
    let res = doc.to_writer(&mut bufwriter);
    if res.is_err() {
        log::error!("dump header bson in {} failed", path.display());
        return Err(anyhow!("dump of bson failed: {}", res.err().unwrap()));
    }
    // now loop on data vectors
    for i in 0..embedded.get_nb_nodes() {
        let mut doc = Document::new();
        let data: Vec<Bson> = embedded.get_embedded_node(i).iter().map(|x| Bson::Double(*x)).collect();
        doc.insert(node_key(i), data);
        let res = doc.to_writer(&mut bufwriter);
        if res.is_err() {
            log::error!("bson dump error in node {i}");
            return Err(anyhow!("bson dump error for node {i} {}", res.err().unwrap()));
        }
    }
    //
    log::info!("bson dump in file {} finished", path.display());
    //
    Ok(())
} // end of bson_dump

/// returns the bson header of an embedding dump
pub fn get_bson_header(fname: &str) -> Result<EmbeddedBsonHeader, anyhow::Error> {
    let path = Path::new(fname);
    log::info!("get_bson_header: trying to open file : {:?}", path);
    let fileres = OpenOptions::new().read(true).open(path);
    let file;
    if fileres.is_ok() {
        file = fileres.unwrap();
    } else {
        log::error!("reload of bson dump failed");
        return Err(anyhow!("reloadfailed: {}", fileres.err().unwrap()));
    }
    let mut bufreader = BufReader::new(file);
    read_header(&mut bufreader, path)
} // end of get_bson_header

fn read_header<R: std::io::Read>(reader: &mut R, path: &Path) -> Result<EmbeddedBsonHeader, anyhow::Error> {
    let res = Document::from_reader(reader);
    if res.is_err() {
        log::error!("could load document from file {}", path.display());
        return Err(anyhow!(res.err().unwrap()));
    }
    let doc = res.unwrap();
    let bson_header = match doc.get("header") {
        Some(header) => header.clone(),
        None => {
            log::error!("could load header from file {}", path.display());
            return Err(anyhow!("could not find header in document"));
        }
    };
    let header: EmbeddedBsonHeader = bson::from_bson(bson_header)?;
    Ok(header)
} // end of read_header

/// reloads embedded data from a previous bson dump.
pub fn bson_load(fname: &str) -> Result<Embedded, anyhow::Error> {
    //
    log::info!("entering bson_load, file name : {:?}", fname);
    //
    let path = Path::new(fname);
    let fileres = OpenOptions::new().read(true).open(path);
    let file;
    if fileres.is_ok() {
        file = fileres.unwrap();
    } else {
        log::error!("reload of bson dump failed");
        return Err(anyhow!("reloadfailed: {}", fileres.err().unwrap()));
    }
    let mut bufreader = BufReader::new(file);
    let header = read_header(&mut bufreader, path)?;
    log::info!("header : {:?}", header);
    if header.version != 1 {
        log::error!("header format version : {}", header.version);
        return Err(anyhow!("format version error, inconsistent with header"));
    }
    if header.type_name != std::any::type_name::<f64>() || !header.symetric {
        log::error!("header as type name : {}, symetric : {}", header.type_name, header.symetric);
        return Err(anyhow!("type error, inconsistent with header"));
    }
    let nb_data: usize = FromPrimitive::from_i64(header.nbdata).ok_or(anyhow!("bad nbdata in header"))?;
    let dim: usize = FromPrimitive::from_i64(header.dimension).ok_or(anyhow!("bad dimension in header"))?;
    log::debug!("bson_load , nb_data = {nb_data}, dim : {dim}");
    let mut array = Array2::<f64>::zeros((0, dim));
    for i in 0..nb_data {
        // we have one document for each node
        let res = Document::from_reader(&mut bufreader);
        if res.is_err() {
            log::error!("could not load document for node {i} from file {}", path.display());
            return Err(anyhow!(res.err().unwrap()));
        }
        let doc = res.unwrap();
        let key = node_key(i);
        let data = match doc.get(&key) {
            Some(data) => data.clone(),
            None => {
                log::error!("could not get record for key {:?}", key);
                return Err(anyhow!("could not get record for key {:?}", key));
            }
        };
        let data_1d: Vec<f64> = bson::from_bson(data)?;
        let res = array.push_row(ArrayView1::from(data_1d.as_slice()));
        if res.is_err() {
            return Err(anyhow!("could not insert array vector {:?}", i));
        }
    }
    log::info!("\t finished bson decoding of embedded vectors");
    Ok(Embedded::new(array))
} // end of bson_load

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_bson_dump_reload() {
        log_init_test();
        let dir = std::env::temp_dir().join(format!("graphzoom_bson_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let fname = dir.join("embedding.bson");
        let fname = fname.to_string_lossy().to_string();
        let embedded = Embedded::new(array![[1., 2., 3.], [-0.5, 0., 7.25]]);
        bson_dump(&embedded, &fname).unwrap();
        let header = get_bson_header(&fname).unwrap();
        assert_eq!(header.nbdata, 2);
        assert_eq!(header.dimension, 3);
        assert!(header.symetric);
        let reloaded = bson_load(&fname).unwrap();
        assert_eq!(reloaded.get_embedded(), embedded.get_embedded());
    }
} // end of mod tests
