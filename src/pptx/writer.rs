//! PPTX package generation.
//!
//! Every slide uses a single blank layout; all content is absolutely
//! positioned. Shapes map one-to-one:
//!
//! | Shape | PresentationML |
//! |-------|----------------|
//! | [`TextBox`] | `p:sp` with `txBox="1"` |
//! | [`Picture`] | `p:pic` referencing `ppt/media/imageN.ext` |
//! | [`TableShape`] | `p:graphicFrame` holding an `a:tbl` |

use super::constants::*;
use crate::error::Pdf2PptxError;
use crate::output::{Align, OutputDocument, Paragraph, Picture, Rect, Shape, Slide, TableShape, TextBox};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Seek, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

type Result<T> = std::result::Result<T, Pdf2PptxError>;

/// Serialise a document into `.pptx` bytes.
pub fn write_pptx(doc: &OutputDocument) -> Result<Vec<u8>> {
    PptxWriter::new(doc).generate()
}

/// PPTX document writer.
pub struct PptxWriter<'a> {
    doc: &'a OutputDocument,
    title: Option<String>,
}

impl<'a> PptxWriter<'a> {
    pub fn new(doc: &'a OutputDocument) -> Self {
        Self { doc, title: None }
    }

    /// Set the presentation title stored in the document properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Generate the PPTX as bytes.
    pub fn generate(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        self.write_content_types(&mut zip, options)?;
        write_part(&mut zip, options, "_rels/.rels", ROOT_RELS)?;
        self.write_doc_props(&mut zip, options)?;
        self.write_presentation(&mut zip, options)?;
        write_part(&mut zip, options, "ppt/presProps.xml", &pres_props())?;
        write_part(&mut zip, options, "ppt/viewProps.xml", &view_props())?;
        write_part(&mut zip, options, "ppt/tableStyles.xml", &table_styles())?;
        write_part(&mut zip, options, "ppt/theme/theme1.xml", &self.theme())?;
        self.write_master_and_layout(&mut zip, options)?;

        for (i, slide) in self.doc.slides.iter().enumerate() {
            self.write_slide(&mut zip, options, i + 1, slide)?;
        }

        for media in &self.doc.media {
            write_part_bytes(&mut zip, options, &format!("ppt/media/{}", media.name), &media.bytes)?;
        }

        let cursor = zip.finish()?;
        let bytes = cursor.into_inner();
        debug!(
            "Serialised {} slides and {} media files into {} bytes",
            self.doc.slides.len(),
            self.doc.media.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    fn write_content_types<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
"#,
        );

        let extensions: BTreeMap<&str, &str> = self
            .doc
            .media
            .iter()
            .filter_map(|m| m.name.rsplit_once('.').map(|(_, ext)| (ext, m.content_type)))
            .collect();
        for (ext, content_type) in extensions {
            content.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                ext, content_type
            ));
        }

        content.push_str(
            r#"  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  <Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/>
  <Override PartName="/ppt/viewProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"/>
  <Override PartName="/ppt/tableStyles.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"/>
  <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
  <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
  <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
  <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#,
        );

        for i in 1..=self.doc.slides.len() {
            content.push_str(&format!(
                "  <Override PartName=\"/ppt/slides/slide{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>\n",
                i
            ));
        }
        content.push_str("</Types>");

        write_part(zip, options, "[Content_Types].xml", &content)
    }

    fn write_doc_props<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        let app = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <TotalTime>0</TotalTime>
  <Application>pdf2pptx</Application>
  <PresentationFormat>Custom</PresentationFormat>
  <Slides>{}</Slides>
  <Notes>0</Notes>
  <HiddenSlides>0</HiddenSlides>
  <ScaleCrop>false</ScaleCrop>
  <LinksUpToDate>false</LinksUpToDate>
  <SharedDoc>false</SharedDoc>
  <HyperlinksChanged>false</HyperlinksChanged>
  <AppVersion>{}</AppVersion>
</Properties>"#,
            self.doc.slides.len(),
            env!("CARGO_PKG_VERSION")
        );
        write_part(zip, options, "docProps/app.xml", &app)?;

        let title = self.title.as_deref().unwrap_or("Presentation");
        let core = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
  <dc:creator>pdf2pptx</dc:creator>
  <cp:lastModifiedBy>pdf2pptx</cp:lastModifiedBy>
</cp:coreProperties>"#,
            escape_xml(title)
        );
        write_part(zip, options, "docProps/core.xml", &core)
    }

    fn write_presentation<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        // rId1 master, rId2 theme, rId3 presProps, rId4 viewProps,
        // rId5 tableStyles, rId6.. slides.
        const FIRST_SLIDE_RID: usize = 6;

        let mut slide_ids = String::new();
        for i in 0..self.doc.slides.len() {
            slide_ids.push_str(&format!(
                "    <p:sldId id=\"{}\" r:id=\"rId{}\"/>\n",
                256 + i,
                FIRST_SLIDE_RID + i
            ));
        }

        let cx = emu(self.doc.slide_size.width);
        let cy = emu(self.doc.slide_size.height);
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">
  <p:sldMasterIdLst>
    <p:sldMasterId id="2147483648" r:id="rId1"/>
  </p:sldMasterIdLst>
  <p:sldIdLst>
{}  </p:sldIdLst>
  <p:sldSz cx="{}" cy="{}"/>
  <p:notesSz cx="{}" cy="{}"/>
</p:presentation>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, slide_ids, cx, cy, cy, cx
        );
        write_part(zip, options, "ppt/presentation.xml", &content)?;

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId2" Type="{}" Target="theme/theme1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps" Target="presProps.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps" Target="viewProps.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles" Target="tableStyles.xml"/>
"#,
            NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_MASTER, REL_TYPE_THEME
        );
        for i in 0..self.doc.slides.len() {
            rels.push_str(&format!(
                "  <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"slides/slide{}.xml\"/>\n",
                FIRST_SLIDE_RID + i,
                REL_TYPE_SLIDE,
                i + 1
            ));
        }
        rels.push_str("</Relationships>");
        write_part(zip, options, "ppt/_rels/presentation.xml.rels", &rels)
    }

    fn theme(&self) -> String {
        let face = escape_xml(&self.doc.font_face);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{}" name="pdf2pptx">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="44546A"/></a:dk2>
      <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
      <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
      <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
      <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
      <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
      <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
      <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
      <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
    </a:clrScheme>
    <a:fontScheme name="pdf2pptx">
      <a:majorFont>
        <a:latin typeface="{face}"/>
        <a:ea typeface="{face}"/>
        <a:cs typeface=""/>
      </a:majorFont>
      <a:minorFont>
        <a:latin typeface="{face}"/>
        <a:ea typeface="{face}"/>
        <a:cs typeface=""/>
      </a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="Office">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
      </a:lnStyleLst>
      <a:effectStyleLst>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
      </a:effectStyleLst>
      <a:bgFillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:bgFillStyleLst>
    </a:fmtScheme>
  </a:themeElements>
</a:theme>"#,
            NS_DRAWING,
            face = face
        )
    }

    fn write_master_and_layout<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        let master = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:cSld>
    <p:bg>
      <p:bgRef idx="1001">
        <a:schemeClr val="bg1"/>
      </p:bgRef>
    </p:bg>
{}  </p:cSld>
  <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
  <p:sldLayoutIdLst>
    <p:sldLayoutId id="2147483649" r:id="rId1"/>
  </p:sldLayoutIdLst>
</p:sldMaster>"#,
            NS_DRAWING,
            NS_RELATIONSHIPS,
            NS_PRESENTATION,
            empty_sp_tree()
        );
        write_part(zip, options, "ppt/slideMasters/slideMaster1.xml", &master)?;

        let master_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="{}" Target="../theme/theme1.xml"/>
</Relationships>"#,
            NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_LAYOUT, REL_TYPE_THEME
        );
        write_part(zip, options, "ppt/slideMasters/_rels/slideMaster1.xml.rels", &master_rels)?;

        let layout = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="blank" preserve="1">
  <p:cSld name="Blank">
{}  </p:cSld>
  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#,
            NS_DRAWING,
            NS_RELATIONSHIPS,
            NS_PRESENTATION,
            empty_sp_tree()
        );
        write_part(zip, options, "ppt/slideLayouts/slideLayout1.xml", &layout)?;

        let layout_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#,
            NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_MASTER
        );
        write_part(zip, options, "ppt/slideLayouts/_rels/slideLayout1.xml.rels", &layout_rels)
    }

    fn write_slide<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
        slide_num: usize,
        slide: &Slide,
    ) -> Result<()> {
        // rId1 is the layout; each distinct picture gets the next id.
        let media_rids: BTreeMap<usize, usize> = slide
            .shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Picture(p) => Some(p.media),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, media)| (media, i + 2))
            .collect();

        let xml = self.slide_xml(slide, &media_rids)?;
        write_part(zip, options, &format!("ppt/slides/slide{}.xml", slide_num), &xml)?;

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>
"#,
            NS_PACKAGE_RELATIONSHIPS, REL_TYPE_SLIDE_LAYOUT
        );
        for (media, rid) in &media_rids {
            let name = &self.doc.media[*media].name;
            rels.push_str(&format!(
                "  <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"../media/{}\"/>\n",
                rid, REL_TYPE_IMAGE, name
            ));
        }
        rels.push_str("</Relationships>");
        write_part(
            zip,
            options,
            &format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
            &rels,
        )
    }

    fn slide_xml(&self, slide: &Slide, media_rids: &BTreeMap<usize, usize>) -> Result<String> {
        let mut shapes = String::new();
        // Id 1 is the group shape.
        for (i, shape) in slide.shapes.iter().enumerate() {
            let id = i + 2;
            match shape {
                Shape::Text(t) => shapes.push_str(&self.text_box_xml(id, t)),
                Shape::Picture(p) => {
                    let media = self.doc.media.get(p.media).ok_or_else(|| {
                        Pdf2PptxError::Serialize(format!(
                            "slide for page {} references missing media {}",
                            slide.page_index + 1,
                            p.media
                        ))
                    })?;
                    let rid = media_rids.get(&p.media).copied().unwrap_or(0);
                    shapes.push_str(&picture_xml(id, p, &media.name, rid));
                }
                Shape::Table(t) => shapes.push_str(&self.table_xml(id, t)),
            }
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
{}    </p:spTree>
  </p:cSld>
  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, shapes
        ))
    }

    fn text_box_xml(&self, id: usize, text: &TextBox) -> String {
        let wrap = if text.wrap { "square" } else { "none" };
        let mut paragraphs = String::new();
        for p in &text.paragraphs {
            paragraphs.push_str(&self.paragraph_xml(p));
        }
        if paragraphs.is_empty() {
            paragraphs.push_str("          <a:p/>\n");
        }
        format!(
            r#"      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="{id}" name="TextBox {id}"/>
          <p:cNvSpPr txBox="1"/>
          <p:nvPr/>
        </p:nvSpPr>
        <p:spPr>
{xfrm}          <a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
          <a:noFill/>
        </p:spPr>
        <p:txBody>
          <a:bodyPr wrap="{wrap}" lIns="0" tIns="0" rIns="0" bIns="0" rtlCol="0" anchor="t"><a:noAutofit/></a:bodyPr>
          <a:lstStyle/>
{paragraphs}        </p:txBody>
      </p:sp>
"#,
            id = id,
            xfrm = xfrm("a", &text.rect),
            wrap = wrap,
            paragraphs = paragraphs
        )
    }

    fn paragraph_xml(&self, p: &Paragraph) -> String {
        let algn = match p.align {
            Align::Left => "l",
            Align::Center => "ctr",
        };
        let mut ppr = format!("algn=\"{}\"", algn);
        if p.indent_pt > 0.0 {
            ppr.push_str(&format!(" marL=\"{}\"", emu(p.indent_pt)));
        }
        let face = if p.monospace {
            MONOSPACE_FACE
        } else {
            self.doc.font_face.as_str()
        };
        let rpr = run_properties(p.size_pt, p.bold, p.italic, face);
        format!(
            "          <a:p>\n            <a:pPr {}/>\n{}          </a:p>\n",
            ppr,
            runs_xml(&p.text, &rpr, p.size_pt)
        )
    }

    fn table_xml(&self, id: usize, table: &TableShape) -> String {
        let cols = table.column_count().max(1);
        let rows = table.rows.len().max(1);
        let width = emu(table.rect.width);
        let height = emu(table.rect.height);
        let col_widths = split_evenly(width, cols);
        let row_heights = split_evenly(height, rows);

        let mut grid = String::new();
        for w in &col_widths {
            grid.push_str(&format!("                <a:gridCol w=\"{}\"/>\n", w));
        }

        let face = self.doc.font_face.as_str();
        let mut body = String::new();
        for (row, h) in table.rows.iter().zip(&row_heights) {
            body.push_str(&format!("                <a:tr h=\"{}\">\n", h));
            for c in 0..cols {
                let (text, size, bold) = row
                    .get(c)
                    .map(|cell| (cell.text.as_str(), cell.size_pt, cell.bold))
                    .unwrap_or(("", row.first().map_or(10, |cell| cell.size_pt), false));
                let rpr = run_properties(size, bold, false, face);
                let mut paragraphs = String::new();
                for line in text.split('\n') {
                    paragraphs.push_str(&format!(
                        "          <a:p>\n            <a:pPr algn=\"ctr\"/>\n{}          </a:p>\n",
                        runs_xml(line, &rpr, size)
                    ));
                }
                body.push_str(&format!(
                    "                  <a:tc>\n                    <a:txBody>\n                      <a:bodyPr/>\n                      <a:lstStyle/>\n{}                    </a:txBody>\n                    <a:tcPr anchor=\"ctr\"/>\n                  </a:tc>\n",
                    paragraphs
                ));
            }
            body.push_str("                </a:tr>\n");
        }

        format!(
            r#"      <p:graphicFrame>
        <p:nvGraphicFramePr>
          <p:cNvPr id="{id}" name="Table {id}"/>
          <p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr>
          <p:nvPr/>
        </p:nvGraphicFramePr>
{xfrm}        <a:graphic>
          <a:graphicData uri="{ns_table}">
            <a:tbl>
              <a:tblPr firstRow="1" bandRow="1"/>
              <a:tblGrid>
{grid}              </a:tblGrid>
{body}            </a:tbl>
          </a:graphicData>
        </a:graphic>
      </p:graphicFrame>
"#,
            id = id,
            xfrm = xfrm("p", &table.rect),
            ns_table = NS_TABLE,
            grid = grid,
            body = body
        )
    }
}

fn picture_xml(id: usize, picture: &Picture, name: &str, rid: usize) -> String {
    let descr = if picture.description.is_empty() {
        name
    } else {
        picture.description.as_str()
    };
    format!(
        r#"      <p:pic>
        <p:nvPicPr>
          <p:cNvPr id="{id}" name="Picture {id}" descr="{descr}"/>
          <p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
          <p:nvPr/>
        </p:nvPicPr>
        <p:blipFill>
          <a:blip r:embed="rId{rid}"/>
          <a:stretch><a:fillRect/></a:stretch>
        </p:blipFill>
        <p:spPr>
{xfrm}          <a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
        </p:spPr>
      </p:pic>
"#,
        id = id,
        descr = escape_xml(descr),
        rid = rid,
        xfrm = xfrm("a", &picture.rect)
    )
}

fn run_properties(size_pt: u32, bold: bool, italic: bool, face: &str) -> String {
    let mut attrs = format!("lang=\"en-US\" sz=\"{}\"", size_pt * FONT_UNITS_PER_POINT);
    if bold {
        attrs.push_str(" b=\"1\"");
    }
    if italic {
        attrs.push_str(" i=\"1\"");
    }
    let face = escape_xml(face);
    format!(
        "<a:rPr {} dirty=\"0\"><a:latin typeface=\"{}\"/><a:ea typeface=\"{}\"/></a:rPr>",
        attrs, face, face
    )
}

/// Runs for one paragraph; embedded newlines become line breaks.
fn runs_xml(text: &str, rpr: &str, size_pt: u32) -> String {
    if text.is_empty() {
        return format!(
            "            <a:endParaRPr lang=\"en-US\" sz=\"{}\" dirty=\"0\"/>\n",
            size_pt * FONT_UNITS_PER_POINT
        );
    }
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str(&format!("            <a:br>{}</a:br>\n", rpr));
        }
        if line.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "            <a:r>{}<a:t>{}</a:t></a:r>\n",
            rpr,
            escape_xml(line)
        ));
    }
    out
}

/// `<{prefix}:xfrm>` for a rectangle in points.
fn xfrm(prefix: &str, rect: &Rect) -> String {
    format!(
        "          <{p}:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></{p}:xfrm>\n",
        emu(rect.x),
        emu(rect.y),
        emu(rect.width).max(1),
        emu(rect.height).max(1),
        p = prefix
    )
}

fn empty_sp_tree() -> &'static str {
    r#"    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
"#
}

fn pres_props() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentationPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"/>"#,
        NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
    )
}

fn view_props() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:viewPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:normalViewPr>
    <p:restoredLeft sz="15620"/>
    <p:restoredTop sz="94660"/>
  </p:normalViewPr>
  <p:gridSpacing cx="72008" cy="72008"/>
</p:viewPr>"#,
        NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
    )
}

fn table_styles() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
        NS_DRAWING
    )
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    content: &str,
) -> Result<()> {
    write_part_bytes(zip, options, name, content.as_bytes())
}

fn write_part_bytes<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    zip.start_file(name, options)?;
    zip.write_all(bytes)
        .map_err(|e| Pdf2PptxError::Serialize(format!("{}: {}", name, e)))
}

/// Points to EMU.
fn emu(pt: f64) -> i64 {
    if pt.is_finite() {
        (pt * EMU_PER_POINT).round() as i64
    } else {
        0
    }
}

/// Split `total` into `parts` integers summing to `total`.
fn split_evenly(total: i64, parts: usize) -> Vec<i64> {
    let parts = parts.max(1) as i64;
    let base = total / parts;
    let mut out = vec![base; parts as usize];
    if let Some(last) = out.last_mut() {
        *last += total - base * parts;
    }
    out
}

/// Escape XML special characters and drop characters XML 1.0 forbids.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}
