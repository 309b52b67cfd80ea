use futures::future::{BoxFuture, FutureExt};
use homework_grader::error::AppResult;
use homework_grader::{App, Config, ExtractBackend, Mode, ToolRun};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const THREE_CELL_NOTEBOOK: &str = r###"{
    "cells": [
        {"cell_type": "code", "source": ["import os"], "outputs": [
            {"output_type": "stream", "name": "stdout", "text": ["ok\n"]}
        ]},
        {"cell_type": "markdown", "source": ["## 结果"]},
        {"cell_type": "code", "source": ["1 + 1"], "outputs": [
            {"output_type": "execute_result", "data": {"text/plain": ["2"]}, "execution_count": 2}
        ]},
        {"cell_type": "code", "source": ["print('done')"], "outputs": [
            {"output_type": "stream", "name": "stdout", "text": "done"}
        ]}
    ],
    "metadata": {},
    "nbformat": 4,
    "nbformat_minor": 5
}"###;

/// 按压缩包文件名"解压"出预设文件，解压到 `<压缩包所在目录>/<文件名去后缀>/`
#[derive(Default)]
struct FakeBackend {
    contents: HashMap<String, Vec<(String, String)>>,
    results: HashMap<String, ToolRun>,
    panics: Vec<String>,
}

impl FakeBackend {
    fn archive(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        self.contents.insert(
            name.to_string(),
            files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        );
        self
    }

    fn result(mut self, name: &str, run: ToolRun) -> Self {
        self.results.insert(name.to_string(), run);
        self
    }

    fn panic_on(mut self, name: &str) -> Self {
        self.panics.push(name.to_string());
        self
    }
}

impl ExtractBackend for FakeBackend {
    fn run<'a>(&'a self, archive: &'a Path) -> BoxFuture<'a, AppResult<ToolRun>> {
        async move {
            let name = archive.file_name().unwrap().to_string_lossy().to_string();
            if self.panics.contains(&name) {
                panic!("解压程序崩溃: {}", name);
            }
            if let Some(run) = self.results.get(&name) {
                return Ok(run.clone());
            }
            let target = archive.with_extension("");
            for (rel, content) in self.contents.get(&name).cloned().unwrap_or_default() {
                let path = target.join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, content).unwrap();
            }
            Ok(ToolRun::finished(true, "Everything is Ok", ""))
        }
        .boxed()
    }
}

struct Workspace {
    _tmp: TempDir,
    config: Config,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            source_dir: tmp.path().join("source"),
            output_dir: tmp.path().join("output"),
            report_path: tmp.path().join("report/report.json"),
            ..Config::default()
        };
        std::fs::create_dir_all(&config.source_dir).unwrap();
        Self { _tmp: tmp, config }
    }

    fn add_source(&self, name: &str) {
        std::fs::write(self.config.source_dir.join(name), b"archive bytes").unwrap();
    }

    fn student_dir(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_single_notebook_with_nested_sources() {
    let ws = Workspace::new();
    ws.add_source("2023001-张三.zip");
    let backend = FakeBackend::default().archive(
        "2023001-张三.zip",
        &[
            ("作业/hw.ipynb", THREE_CELL_NOTEBOOK),
            ("作业/src/lib/a.py", "print('a')"),
            ("作业/src/lib/b.py", "print('b')"),
            ("作业/说明.pdf", "%PDF"),
        ],
    );

    let app = App::new(backend, ws.config.clone());
    let results = app.run(Mode::Extract).await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.is_success(), "{}", result.error);
    assert_eq!(result.student.student_id, "2023001");
    assert_eq!(result.student.name, "张三");
    assert_eq!(result.summary.total_notebooks, 1);
    assert_eq!(result.summary.total_code_blocks, 3);
    assert!(result.summary.all_blocks_have_output);
    assert!(!result.summary.has_error);
    assert!(!result.summary.has_image);
    assert_eq!(result.summary.secondary_file_count, 2);

    assert_eq!(entries(&ws.student_dir("2023001-张三")), vec!["hw.ipynb"]);
    // 源压缩包不受影响
    assert!(ws.config.source_dir.join("2023001-张三.zip").exists());
    assert!(ws.config.report_path.exists());
}

#[tokio::test]
async fn test_same_named_notebooks_are_both_kept() {
    let ws = Workspace::new();
    ws.add_source("2023002-李四.7z");
    let backend = FakeBackend::default().archive(
        "2023002-李四.7z",
        &[("part1/hw.ipynb", "{\"cells\": []}"), ("part2/hw.ipynb", THREE_CELL_NOTEBOOK)],
    );

    let app = App::new(backend, ws.config.clone());
    let results = app.run(Mode::Extract).await.unwrap();

    assert_eq!(results[0].summary.total_notebooks, 2);
    let student_dir = ws.student_dir("2023002-李四");
    assert_eq!(entries(&student_dir), vec!["hw.ipynb", "hw_1.ipynb"]);
    assert_eq!(
        std::fs::read_to_string(student_dir.join("hw_1.ipynb")).unwrap(),
        THREE_CELL_NOTEBOOK
    );
}

#[tokio::test]
async fn test_password_protected_archive_does_not_stop_batch() {
    let ws = Workspace::new();
    ws.add_source("2023003-王五.rar");
    ws.add_source("2023004-赵六.zip");
    let backend = FakeBackend::default()
        .result(
            "2023003-王五.rar",
            ToolRun::finished(false, "", "ERROR: Wrong password : hw.ipynb"),
        )
        .archive("2023004-赵六.zip", &[("hw.ipynb", THREE_CELL_NOTEBOOK)]);

    let app = App::new(backend, ws.config.clone());
    let results = app.run(Mode::Extract).await.unwrap();

    assert_eq!(results.len(), 2);
    let locked = &results[0];
    assert_eq!(locked.student.student_id, "2023003");
    assert!(locked.is_success());
    assert_eq!(locked.summary.total_notebooks, 0);
    assert!(locked.summary.all_blocks_have_output);
    assert!(entries(&ws.student_dir("2023003-王五")).is_empty());

    let next = &results[1];
    assert_eq!(next.student.student_id, "2023004");
    assert_eq!(next.summary.total_notebooks, 1);
}

#[tokio::test]
async fn test_crashing_submission_is_isolated() {
    let ws = Workspace::new();
    ws.add_source("1-甲.zip");
    ws.add_source("2-乙.zip");
    let backend = FakeBackend::default()
        .panic_on("1-甲.zip")
        .archive("2-乙.zip", &[("hw.ipynb", THREE_CELL_NOTEBOOK)]);

    let app = App::new(backend, ws.config.clone());
    let results = app.run(Mode::Extract).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(!results[0].is_success());
    assert!(results[0].error.contains("处理任务异常终止"));
    assert_eq!(results[0].summary.total_notebooks, 0);
    assert!(results[1].is_success());
    assert_eq!(results[1].summary.total_notebooks, 1);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ws.config.report_path).unwrap()).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["failed"], 1);
}

#[tokio::test]
async fn test_entries_without_separator_are_ignored() {
    let ws = Workspace::new();
    ws.add_source("readme.zip");
    ws.add_source("1-甲.txt");

    let app = App::new(FakeBackend::default(), ws.config.clone());
    let results = app.run(Mode::Extract).await.unwrap();

    assert!(results.is_empty());
    assert!(!ws.config.report_path.exists());
}

#[tokio::test]
async fn test_missing_source_directory_is_fatal() {
    let ws = Workspace::new();
    std::fs::remove_dir_all(&ws.config.source_dir).unwrap();

    let app = App::new(FakeBackend::default(), ws.config.clone());
    assert!(app.run(Mode::Extract).await.is_err());
}

#[tokio::test]
async fn test_output_equal_to_source_is_rejected() {
    let ws = Workspace::new();
    ws.add_source("1-甲.zip");
    let config = Config {
        output_dir: ws.config.source_dir.clone(),
        ..ws.config.clone()
    };

    let app = App::new(FakeBackend::default(), config);
    assert!(app.run(Mode::Extract).await.is_err());
    // 源目录未被清空
    assert!(ws.config.source_dir.join("1-甲.zip").exists());
}

#[tokio::test]
async fn test_output_containing_source_is_rejected() {
    let ws = Workspace::new();
    ws.add_source("1-甲.zip");
    let parent = ws.config.source_dir.parent().unwrap().to_path_buf();
    let config = Config {
        output_dir: parent,
        ..ws.config.clone()
    };

    let app = App::new(FakeBackend::default(), config);
    assert!(app.run(Mode::Extract).await.is_err());
    assert!(ws.config.source_dir.join("1-甲.zip").exists());
}

#[tokio::test]
async fn test_analysis_after_extraction() {
    let ws = Workspace::new();
    ws.add_source("2023005-孙七.zip");
    let backend = FakeBackend::default().archive(
        "2023005-孙七.zip",
        &[
            ("a/one.ipynb", THREE_CELL_NOTEBOOK),
            ("b/two.ipynb", r#"{"cells": [{"cell_type": "code", "outputs": []}]}"#),
        ],
    );
    let app = App::new(backend, ws.config.clone());
    app.run(Mode::Extract).await.unwrap();

    // 整理后手工放入的杂项文件会在统计阶段被清理
    let student_dir = ws.student_dir("2023005-孙七");
    std::fs::write(student_dir.join("notes.txt"), "x").unwrap();
    std::fs::create_dir_all(ws.config.output_dir.join("无分隔符目录")).unwrap();

    let results = app.run(Mode::Analyze).await.unwrap();

    assert_eq!(results.len(), 1);
    let summary = &results[0].summary;
    assert_eq!(summary.total_notebooks, 2);
    assert_eq!(summary.total_code_blocks, 4);
    assert!(!summary.all_blocks_have_output);
    assert_eq!(summary.secondary_file_count, 0);
    assert_eq!(summary.per_file_details[0].file_name, "one.ipynb");
    assert!(results[0].grading.is_none());
    assert!(!student_dir.join("notes.txt").exists());
}
