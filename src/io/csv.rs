//! Dense matrices (node features, embeddings) and edge lists in csv files.
//!
//! A dense matrix file has one line per node, in node rank order, and no header.

use anyhow::anyhow;

use std::fs::OpenOptions;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::{Array2, ArrayView1};
use petgraph::visit::EdgeRef;

use crate::laplacian::WeightedGraph;

/// reads a dense matrix from a csv file, one row per node.
/// All rows must have the same number of fields.
pub fn read_dense_csv(filepath: &Path, delim: u8) -> anyhow::Result<Array2<f64>> {
    //
    let fileres = OpenOptions::new().read(true).open(filepath);
    if fileres.is_err() {
        log::error!("read_dense_csv : could not open file {:?}", filepath.as_os_str());
        return Err(anyhow!("read_dense_csv could not open file {}", filepath.display()));
    }
    let file = fileres.unwrap();
    let mut rdr = ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);
    //
    let mut data = Vec::<f64>::with_capacity(100_000);
    let mut nb_col: Option<usize> = None;
    let mut nb_record = 0;
    for result in rdr.records() {
        let record = result?;
        if nb_col.is_none() {
            nb_col = Some(record.len());
        }
        for field in record.iter() {
            match field.parse::<f64>() {
                Ok(v) => data.push(v),
                Err(_) => {
                    log::error!("read_dense_csv : could not parse {:?} in record {}", field, nb_record);
                    return Err(anyhow!("could not parse {:?} in record {} of {}", field, nb_record, filepath.display()));
                }
            }
        }
        nb_record += 1;
    }
    let nb_col = nb_col.unwrap_or(0);
    log::info!("read_dense_csv {:?} nb rows : {}, nb columns : {}", filepath, nb_record, nb_col);
    let array = Array2::from_shape_vec((nb_record, nb_col), data)?;
    Ok(array)
} // end of read_dense_csv

/// writes a dense matrix, one row per line
pub fn write_dense_csv(filepath: &Path, array: &Array2<f64>, delim: u8) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delim).has_headers(false).from_path(filepath)?;
    for row in array.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    log::info!("write_dense_csv {:?} , shape : {:?}", filepath, array.dim());
    Ok(())
} // end of write_dense_csv

/// dumps an undirected weighted graph as an edge list `node1,node2,weight` with 0-based nodes.
/// Nodes without edge do not appear so the number of nodes must be transmitted besides.
pub fn write_edgelist_csv(filepath: &Path, graph: &WeightedGraph) -> anyhow::Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(filepath)?;
    for edge in graph.edge_references() {
        wtr.write_record(&[
            edge.source().index().to_string(),
            edge.target().index().to_string(),
            edge.weight().to_string(),
        ])?;
    }
    wtr.flush()?;
    log::debug!("write_edgelist_csv {:?} nb edges : {}", filepath, graph.edge_count());
    Ok(())
} // end of write_edgelist_csv

/// checks a row has no Nan or Inf
pub(crate) fn is_finite_row(row: ArrayView1<f64>) -> bool {
    row.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_dense_write_read() {
        log_init_test();
        let dir = std::env::temp_dir().join(format!("graphzoom_csv_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("embedding.csv");
        let array = array![[1., -2.5, 0.], [0.125, 3., 1.0E-3]];
        write_dense_csv(&path, &array, b',').unwrap();
        let reloaded = read_dense_csv(&path, b',').unwrap();
        assert_eq!(reloaded.dim(), (2, 3));
        assert_eq!(reloaded, array);
        assert!(reloaded.rows().into_iter().all(|r| is_finite_row(r)));
    }

    #[test]
    fn test_read_features_space_delimited() {
        log_init_test();
        let dir = std::env::temp_dir().join(format!("graphzoom_csv_space_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feats.txt");
        std::fs::write(&path, "# features\n1 0\n0 1\n1 1\n").unwrap();
        let feats = read_dense_csv(&path, b' ').unwrap();
        assert_eq!(feats.dim(), (3, 2));
        assert_eq!(feats[[2, 1]], 1.);
        std::fs::write(&path, "1 0\n0 x\n").unwrap();
        assert!(read_dense_csv(&path, b' ').is_err());
        // ragged rows are rejected
        std::fs::write(&path, "1 0\n0\n").unwrap();
        assert!(read_dense_csv(&path, b' ').is_err());
    }
} // end of mod tests
