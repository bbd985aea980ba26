//! Adapter to the external Lamg coarsening tool.
//!
//! The tool is a compiled matlab program launched by a script :
//!
//! `run_coarsening.sh <mcr_dir> <input.mtx> <ratio> <n|f> <output_dir>`
//!
//! In mode n it coarsens the input graph and writes in output_dir :
//! - NumLevels.txt : number of levels + 1
//! - CPUtime.txt : cpu time of the reduction in seconds
//! - Projection_i.mtx for i in 1..=levels : the mapping of level i - 1
//! - Gs.mtx : the coarsest graph
//!
//! In mode f it runs a single pass and writes Mapping.mtx, used to build the feature graph.
//!
//! If no script is given, the files must already be in output_dir (a previous run of the tool).

use anyhow::anyhow;

use std::path::PathBuf;
use std::process::Command;

use sprs::CsMat;

use super::params::LamgParams;
use super::{CoarsenMode, CoarsenerT, Coarsening, Hierarchy};
use crate::io::mtx::{read_cpu_time, read_lamg_graph, read_lamg_mapping, read_levels, write_mtx};

/// tool mode for a multilevel reduction
const REDUCTION_FLAG: &str = "n";
/// tool mode for the fusion pass
const FUSION_FLAG: &str = "f";

pub struct LamgCoarsener {
    params: LamgParams,
}

impl LamgCoarsener {
    pub fn new(params: LamgParams) -> Self {
        LamgCoarsener { params }
    }

    pub fn get_params(&self) -> &LamgParams {
        &self.params
    }

    fn output_file(&self, name: &str) -> PathBuf {
        self.params.output_dir.join(name)
    }

    // the output files the tool must have produced
    fn check_outputs(&self, names: &[String]) -> anyhow::Result<()> {
        for name in names {
            let path = self.output_file(name);
            if !path.exists() {
                log::error!("Lamg output {} is missing", path.display());
                return Err(anyhow!("Lamg output file {} is missing", path.display()));
            }
        }
        Ok(())
    }

    /// writes the laplacian where the tool reads it and runs the tool. Does nothing if no script is configured.
    fn run_tool(&self, laplacian: &CsMat<f64>, input_name: &str, flag: &str, ratio: usize) -> anyhow::Result<()> {
        let script = match &self.params.script {
            Some(script) => script,
            None => {
                log::info!(
                    "no Lamg script, using results already present in {}",
                    self.params.output_dir.display()
                );
                return Ok(());
            }
        };
        std::fs::create_dir_all(&self.params.output_dir)?;
        let input = self.output_file(input_name);
        write_mtx(&input, laplacian)?;
        log::info!(
            "running {:?} {:?} {:?} {} {} {:?}",
            script,
            self.params.mcr_dir,
            input,
            ratio,
            flag,
            self.params.output_dir
        );
        let status = Command::new(script)
            .arg(&self.params.mcr_dir)
            .arg(&input)
            .arg(ratio.to_string())
            .arg(flag)
            .arg(&self.params.output_dir)
            .status();
        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                log::error!("Lamg tool exited with {}", status);
                Err(anyhow!("Lamg tool {:?} failed : {}", script, status))
            }
            Err(e) => {
                log::error!("could not launch Lamg tool {:?} : {}", script, e);
                Err(anyhow!("could not launch Lamg tool {:?} : {}", script, e))
            }
        }
    } // end of run_tool

    /// reads the hierarchy written by the tool in output_dir, laplacian being the graph the tool coarsened.
    pub fn load_hierarchy(&self, laplacian: &CsMat<f64>) -> anyhow::Result<Hierarchy> {
        let nb_levels = read_levels(&self.output_file("NumLevels.txt"))?;
        log::info!("Lamg reduction has {} levels", nb_levels);
        let names: Vec<String> = (1..=nb_levels).map(|i| format!("Projection_{}.mtx", i)).collect();
        self.check_outputs(&names)?;
        let mut projections = Vec::<CsMat<f64>>::with_capacity(nb_levels);
        for name in &names {
            let projection = read_lamg_mapping(&self.output_file(name))?;
            log::debug!("{} : {} fine nodes, {} coarse nodes", name, projection.rows(), projection.cols());
            projections.push(projection);
        }
        Hierarchy::from_projections(laplacian, projections)
    } // end of load_hierarchy
} // end of impl LamgCoarsener

impl CoarsenerT for LamgCoarsener {
    fn coarsen(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<Coarsening> {
        self.run_tool(laplacian, "Input.mtx", REDUCTION_FLAG, self.params.reduce_ratio)?;
        self.check_outputs(&[String::from("NumLevels.txt"), String::from("CPUtime.txt"), String::from("Gs.mtx")])?;
        let hierarchy = self.load_hierarchy(laplacian)?;
        let reported_time = read_cpu_time(&self.output_file("CPUtime.txt"))?;
        let coarse_graph = read_lamg_graph(&self.output_file("Gs.mtx"))?;
        if coarse_graph.node_count() != hierarchy.get_nb_coarse_nodes() {
            log::error!(
                "Gs.mtx has {} nodes, last projection has {} coarse nodes",
                coarse_graph.node_count(),
                hierarchy.get_nb_coarse_nodes()
            );
            return Err(anyhow!(
                "coarse graph has {} nodes, hierarchy has {}",
                coarse_graph.node_count(),
                hierarchy.get_nb_coarse_nodes()
            ));
        }
        log::info!("Lamg reported reduction cpu time : {:.3} s", reported_time);
        Ok(Coarsening {
            hierarchy,
            coarse_graph,
            reported_time: Some(reported_time),
        })
    } // end of coarsen

    fn fusion_mapping(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<CsMat<f64>> {
        self.run_tool(laplacian, "Graph.mtx", FUSION_FLAG, self.params.search_ratio)?;
        self.check_outputs(&[String::from("Mapping.mtx")])?;
        let mapping = read_lamg_mapping(&self.output_file("Mapping.mtx"))?;
        if mapping.rows() != laplacian.rows() {
            return Err(anyhow!(
                "Mapping.mtx has {} fine nodes, graph has {}",
                mapping.rows(),
                laplacian.rows()
            ));
        }
        Ok(mapping)
    }

    fn persist_fused(&self, fused: &CsMat<f64>) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.params.output_dir)?;
        let path = self.output_file("Fused.mtx");
        write_mtx(&path, fused)?;
        log::info!("fused laplacian written in {}", path.display());
        Ok(())
    }

    fn get_mode(&self) -> CoarsenMode {
        CoarsenMode::Lamg
    }
} // end of impl CoarsenerT for LamgCoarsener

//========================================================================================

// end of mod tests
